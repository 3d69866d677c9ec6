//! Transfer engine module
//!
//! Contains the throughput measurement core: session state, the observer
//! event channel, the transport seam, and the engine driving download and
//! upload sessions.

pub mod engine;
pub mod event;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use engine::ThroughputEngine;
pub use event::{Direction, ObserverId, TransferEvent, TransferStatus};
pub use session::SessionSnapshot;
pub use transport::{ByteStream, HttpTransport, Transport};
