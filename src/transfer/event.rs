//! Transfer event envelope and observer registry
//!
//! Every lifecycle notification the engine emits travels through the
//! observer registry: a growable list of callbacks invoked synchronously,
//! in registration order, before the emitting call returns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Direction of a transfer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

/// Lifecycle status carried by a transfer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// A chunk or upload request finished; the session continues
    Progress,
    /// The transfer ran to its natural end
    Completed,
    /// The transfer failed; no further events follow for this session
    Errored,
    /// The session was stopped by the caller
    Stopped,
}

impl TransferStatus {
    /// Whether this status ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Progress)
    }
}

/// Event envelope broadcast to observers
///
/// The time-derived fields (`duration`, `ended_at`, `speed`) are computed
/// fresh at emission time from the session's measurement origin, so two
/// events with the same byte count report different instantaneous rates.
#[derive(Debug, Clone, Serialize)]
pub struct TransferEvent {
    pub direction: Direction,
    pub status: TransferStatus,
    /// Bytes accumulated by the session so far
    pub bytes: u64,
    /// Underlying failure, present only on `Errored` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Measured window length in seconds at emission time
    pub duration: f64,
    /// Origin of the measured window (rebased by warm-up detection)
    pub started_at: DateTime<Utc>,
    /// Instant this event was emitted
    pub ended_at: DateTime<Utc>,
    /// Formatted bitrate over the measured window
    pub speed: String,
}

/// Handle identifying a registered observer
pub type ObserverId = usize;

type ObserverFn = Arc<dyn Fn(&TransferEvent) + Send + Sync>;

/// Registry of event observers, notified in registration order
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: ObserverId,
    observers: Vec<(ObserverId, ObserverFn)>,
}

impl ObserverRegistry {
    /// Register an observer and return its handle
    pub fn register(
        &mut self,
        observer: impl Fn(&TransferEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, Arc::new(observer)));
        id
    }

    /// Remove a previously registered observer
    ///
    /// Returns `false` if the handle was already removed.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    // Cloned handles let the engine notify outside its own locks.
    pub(crate) fn snapshot(&self) -> Vec<ObserverFn> {
        self.observers.iter().map(|(_, f)| Arc::clone(f)).collect()
    }
}
