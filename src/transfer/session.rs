//! Transfer session state
//!
//! One session per directional transfer attempt. The record is owned
//! exclusively by the engine for the session's lifetime and replaced
//! wholesale by the next start; there is no reuse across runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::util::units::format_rate;

use super::event::{Direction, TransferEvent, TransferStatus};

/// Mutable state of one in-flight transfer
pub struct TransferSession {
    direction: Direction,
    /// Monotonically non-decreasing byte counter, zeroed at session start
    bytes_transferred: u64,
    /// Origin of the *measured* window; rebased when warm-up is detected
    measurement_started_at: DateTime<Utc>,
    warmup_detected: bool,
    /// Fires the download read loop's cancellation; taken when consumed
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl TransferSession {
    pub(crate) fn new(direction: Direction, cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            direction,
            bytes_transferred: 0,
            measurement_started_at: Utc::now(),
            warmup_detected: false,
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Account for one received chunk or completed upload request
    pub(crate) fn record_bytes(&mut self, len: usize) {
        self.bytes_transferred += len as u64;
    }

    /// Move the measurement origin to now, discarding setup time
    pub(crate) fn rebase_measurement(&mut self) {
        self.measurement_started_at = Utc::now();
    }

    /// Confirm the payload has begun flowing and rebase the window
    pub(crate) fn mark_warmup_detected(&mut self) {
        self.warmup_detected = true;
        self.rebase_measurement();
    }

    pub(crate) fn warmup_detected(&self) -> bool {
        self.warmup_detected
    }

    /// Take the cancellation handle, invalidating it for later calls
    pub(crate) fn take_cancel(&mut self) -> Option<oneshot::Sender<()>> {
        self.cancel_tx.take()
    }

    /// Build an event envelope from the current state
    ///
    /// `duration`, `ended_at`, and `speed` are derived from the measurement
    /// origin and the current instant at every call, never cached.
    pub(crate) fn event(&self, status: TransferStatus, error: Option<String>) -> TransferEvent {
        let started_at = self.measurement_started_at;
        let ended_at = Utc::now();
        let duration_ms = ended_at
            .signed_duration_since(started_at)
            .num_milliseconds()
            .max(0);

        TransferEvent {
            direction: self.direction,
            status,
            bytes: self.bytes_transferred,
            error,
            duration: duration_ms as f64 / 1000.0,
            started_at,
            ended_at,
            speed: format_rate(self.bytes_transferred, started_at, ended_at),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            direction: self.direction,
            bytes_transferred: self.bytes_transferred,
            measurement_started_at: self.measurement_started_at,
            warmup_detected: self.warmup_detected,
        }
    }
}

/// Read-only view of a session's measurement state
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub direction: Direction,
    pub bytes_transferred: u64,
    pub measurement_started_at: DateTime<Utc>,
    pub warmup_detected: bool,
}
