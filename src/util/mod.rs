//! Shared utilities
//!
//! Formatting helpers for rates and elapsed-time display values.

pub mod units;
