//! byrate - Network throughput measurement engine
//!
//! Drives a sustained HTTP transfer (download or upload) against a remote
//! endpoint and converts observed byte counts over elapsed time into a
//! human-readable bitrate. Ships the measurement engine and an elapsed-time
//! stopwatch; rendering and test orchestration are left to the caller.

use std::fmt;

// Public re-exports
pub mod config;
pub mod timer;
pub mod transfer;
pub mod util;

pub use config::EndpointConfig;
pub use timer::{ElapsedTimer, TimerTick};
pub use transfer::{
    Direction, SessionSnapshot, ThroughputEngine, TransferEvent, TransferStatus,
};
pub use util::units::format_rate;

// Common error types
#[derive(Debug)]
pub enum ByrateError {
    /// The transport cannot expose an incremental byte stream
    UnsupportedTransport(String),
    /// Request or stream failed at the network level
    NetworkFailure(String),
    /// Upload endpoint answered with a non-success HTTP status
    UpstreamStatus(u16),
    /// Endpoint configuration validation or parsing error
    ConfigError(String),
}

impl fmt::Display for ByrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByrateError::UnsupportedTransport(msg) => {
                write!(f, "Unsupported transport: {}", msg)
            }
            ByrateError::NetworkFailure(msg) => write!(f, "Network failure: {}", msg),
            ByrateError::UpstreamStatus(code) => {
                write!(f, "Upstream returned status {}", code)
            }
            ByrateError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ByrateError {}

impl From<reqwest::Error> for ByrateError {
    fn from(err: reqwest::Error) -> Self {
        ByrateError::NetworkFailure(err.to_string())
    }
}

impl From<toml::de::Error> for ByrateError {
    fn from(err: toml::de::Error) -> Self {
        ByrateError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for ByrateError {
    fn from(err: toml::ser::Error) -> Self {
        ByrateError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for byrate operations
pub type Result<T> = std::result::Result<T, ByrateError>;

// Common types and constants
pub const APP_NAME: &str = "byrate";
pub const CONFIG_FILE: &str = "byrate.toml";

/// Marker the download endpoint may prefix to signal true transfer start
pub const START_MARKER: &[u8; 5] = b"start";
/// Size of one upload filler payload
pub const UPLOAD_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Number of sequential whole-payload upload requests per session
pub const UPLOAD_REQUEST_COUNT: usize = 10;
/// Byte value the upload filler payload is filled with
pub const UPLOAD_FILL_BYTE: u8 = b'0';
