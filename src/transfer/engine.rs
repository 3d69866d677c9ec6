//! Throughput measurement engine
//!
//! Drives one transfer session at a time, accumulates byte counts from the
//! transport, detects the true measurement start, and broadcasts rate
//! events to registered observers. Duration enforcement belongs to the
//! caller: the engine never schedules its own stop.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Url;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::EndpointConfig;
use crate::util::units::format_rate;
use crate::{
    ByrateError, Result, START_MARKER, UPLOAD_FILL_BYTE, UPLOAD_PAYLOAD_BYTES,
    UPLOAD_REQUEST_COUNT,
};

use super::event::{Direction, ObserverId, ObserverRegistry, TransferEvent, TransferStatus};
use super::session::{SessionSnapshot, TransferSession};
use super::transport::{HttpTransport, Transport};

/// Network throughput measurement engine
///
/// Manages one [`TransferSession`] at a time. All transfer failures are
/// surfaced through the observer channel as `Errored` events; the only
/// error a start operation returns directly is a transport that cannot
/// stream. Callers running on a multi-threaded runtime must serialize
/// `start_download`/`start_upload`/`stop` on one engine instance.
pub struct ThroughputEngine {
    endpoints: EndpointConfig,
    transport: Arc<dyn Transport>,
    session: Mutex<Option<TransferSession>>,
    observers: Mutex<ObserverRegistry>,
}

impl ThroughputEngine {
    /// Create an engine using the HTTP transport
    pub fn new(endpoints: EndpointConfig) -> Result<Self> {
        endpoints.validate()?;
        let transport = Arc::new(HttpTransport::new()?);

        Ok(Self::with_transport(endpoints, transport))
    }

    /// Create an engine over a custom transport
    pub fn with_transport(endpoints: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoints,
            transport,
            session: Mutex::new(None),
            observers: Mutex::new(ObserverRegistry::default()),
        }
    }

    /// Register an observer receiving every event of every session
    pub fn on_event(
        &self,
        observer: impl Fn(&TransferEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observers.lock().unwrap().register(observer)
    }

    /// Remove a previously registered observer
    pub fn off_event(&self, id: ObserverId) -> bool {
        self.observers.lock().unwrap().unregister(id)
    }

    /// Read-only view of the current session, if any
    pub fn session(&self) -> Option<SessionSnapshot> {
        self.session.lock().unwrap().as_ref().map(|s| s.snapshot())
    }

    /// Format a rate sample; delegates to [`format_rate`]
    pub fn format_rate(bytes: u64, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> String {
        format_rate(bytes, started_at, ended_at)
    }

    /// Run a download session to termination
    ///
    /// Streams the response body chunk by chunk, emitting `progress` after
    /// every chunk and a terminal `completed`/`errored` event. The first
    /// chunk's leading bytes are inspected for the warm-up marker; when
    /// present the measurement window is rebased to exclude setup latency.
    ///
    /// Returns `Err` only when the transport cannot expose an incremental
    /// stream; every transfer-level failure becomes an `errored` event.
    pub async fn start_download(&self, params: &[(String, String)]) -> Result<()> {
        let url = build_request_url(&self.endpoints.download_url, params)?;
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        *self.session.lock().unwrap() = Some(TransferSession::new(Direction::Download, cancel_tx));

        info!(url = %url, "starting download session");

        let mut stream = match self.transport.open_download(url).await {
            Ok(stream) => stream,
            Err(err @ ByrateError::UnsupportedTransport(_)) => return Err(err),
            Err(err) => {
                warn!(error = %err, "download request failed");
                self.finish_session();
                self.emit(TransferStatus::Errored, Some(err.to_string()));
                return Ok(());
            }
        };

        let mut first_chunk = true;

        loop {
            tokio::select! {
                // Cancellation wins every race so no progress event can
                // follow the stopped event.
                biased;

                _ = &mut cancel_rx => {
                    debug!("download cancelled, read loop exiting");
                    return Ok(());
                }

                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        self.record_download_chunk(&chunk, first_chunk);
                        first_chunk = false;
                        self.emit(TransferStatus::Progress, None);
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "download stream failed");
                        self.finish_session();
                        self.emit(TransferStatus::Errored, Some(err.to_string()));
                        return Ok(());
                    }
                    None => {
                        self.finish_session();
                        self.emit(TransferStatus::Completed, None);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run an upload session to termination
    ///
    /// Issues a fixed number of sequential whole-payload requests, each
    /// awaited in full before the next begins; parallelizing would change
    /// the meaning of the measured rate. The measurement window opens after
    /// the first successful request. A failed request is terminal and the
    /// remaining ones are never dispatched.
    pub async fn start_upload(&self, params: &[(String, String)]) -> Result<()> {
        let url = build_request_url(&self.endpoints.upload_url, params)?;
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        *self.session.lock().unwrap() = Some(TransferSession::new(Direction::Upload, cancel_tx));

        info!(url = %url, "starting upload session");

        let payload = Bytes::from(vec![UPLOAD_FILL_BYTE; UPLOAD_PAYLOAD_BYTES]);

        for request_no in 0..UPLOAD_REQUEST_COUNT {
            // A fired cancel suppresses the remaining requests; the one
            // already dispatched was allowed to finish.
            if cancel_rx.try_recv().is_ok() {
                debug!(request_no, "upload cancelled between requests");
                return Ok(());
            }

            if let Err(err) = self
                .transport
                .send_upload(url.clone(), payload.clone())
                .await
            {
                warn!(error = %err, request_no, "upload request failed");
                self.finish_session();
                self.emit(TransferStatus::Errored, Some(err.to_string()));
                return Ok(());
            }

            {
                let mut guard = self.session.lock().unwrap();
                if let Some(session) = guard.as_mut() {
                    session.record_bytes(payload.len());
                    // Setup cost of the first request is accepted as part
                    // of the measured window; no marker scan on uploads.
                    if request_no == 0 {
                        session.rebase_measurement();
                    }
                }
            }

            if request_no + 1 < UPLOAD_REQUEST_COUNT {
                self.emit(TransferStatus::Progress, None);
            }
        }

        self.finish_session();
        self.emit(TransferStatus::Completed, None);
        Ok(())
    }

    /// Stop the active transfer, if any
    ///
    /// Requests cancellation of a live download stream (cancelling an
    /// already-finished or absent stream is a silent no-op) and always
    /// emits a terminal `stopped` event carrying the bytes accumulated so
    /// far. Legal with no active session.
    pub fn stop(&self) {
        let cancel_tx = {
            let mut guard = self.session.lock().unwrap();
            guard.as_mut().and_then(|session| session.take_cancel())
        };

        if let Some(tx) = cancel_tx {
            let _ = tx.send(());
        }

        info!("transfer stopped");
        self.emit(TransferStatus::Stopped, None);
    }

    fn record_download_chunk(&self, chunk: &[u8], first_chunk: bool) {
        let mut guard = self.session.lock().unwrap();
        let Some(session) = guard.as_mut() else {
            return;
        };

        session.record_bytes(chunk.len());

        // The marker is only recognized at the head of the first chunk; a
        // marker split across chunks goes undetected (known limitation of
        // the wire format).
        if first_chunk
            && !session.warmup_detected()
            && chunk.len() >= START_MARKER.len()
            && &chunk[..START_MARKER.len()] == START_MARKER
        {
            debug!("warm-up marker detected, measurement window rebased");
            session.mark_warmup_detected();
        }
    }

    // Drops the cancel handle so a later stop() is a pure no-op plus event.
    fn finish_session(&self) {
        let mut guard = self.session.lock().unwrap();
        if let Some(session) = guard.as_mut() {
            session.take_cancel();
        }
    }

    fn emit(&self, status: TransferStatus, error: Option<String>) {
        let event = {
            let guard = self.session.lock().unwrap();
            match guard.as_ref() {
                Some(session) => session.event(status, error),
                None => idle_event(status, error),
            }
        };

        let observers = self.observers.lock().unwrap().snapshot();
        for observer in &observers {
            observer(&event);
        }
    }
}

/// Envelope for events emitted with no session on record
fn idle_event(status: TransferStatus, error: Option<String>) -> TransferEvent {
    let now = Utc::now();

    TransferEvent {
        direction: Direction::Download,
        status,
        bytes: 0,
        error,
        duration: 0.0,
        started_at: now,
        ended_at: now,
        speed: format_rate(0, now, now),
    }
}

/// Build a request URI with the caller's params plus a cache-busting token
///
/// The random token defeats intermediary caches that would otherwise
/// short-circuit the transfer. Param semantics belong to the endpoint; the
/// engine only serializes the mapping it is given.
fn build_request_url(base: &str, params: &[(String, String)]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ByrateError::ConfigError(format!("invalid endpoint URL {}: {}", base, e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("cache", &format!("{:x}", rand::random::<u64>()));
    }

    Ok(url)
}
