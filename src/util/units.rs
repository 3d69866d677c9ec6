//! Units formatting and conversion utilities
//!
//! Converts accumulated byte counts and a measured time window into a
//! human-readable bitrate with automatic decimal unit scaling.

use chrono::{DateTime, Utc};

/// Ordered decimal bitrate units, largest-qualifying wins
const UNITS: &[(&str, f64)] = &[
    ("Kbps", 1e3),
    ("Mbps", 1e6),
    ("Gbps", 1e9),
    ("Tbps", 1e12),
    ("Pbps", 1e15),
    ("Ebps", 1e18),
];

/// Format a rate sample as a human-readable bitrate string
///
/// Computes bits per second from `bytes` over the `started_at..ended_at`
/// window and scales it by the largest decimal unit it reaches, printed
/// with exactly two decimal places. A zero or negative window always
/// yields the `"0 bps"` label, distinct from a computed zero rate.
///
/// # Examples
/// ```
/// use byrate::util::units::format_rate;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.timestamp_millis_opt(0).unwrap();
/// let t1 = t0 + Duration::milliseconds(1000);
///
/// assert_eq!(format_rate(1_250_000, t0, t1), "10.00 Mbps");
/// assert_eq!(format_rate(1_250_000, t1, t0), "0 bps");
/// ```
pub fn format_rate(bytes: u64, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> String {
    let window_ms = ended_at.signed_duration_since(started_at).num_milliseconds();

    if window_ms <= 0 {
        return "0 bps".to_string();
    }

    let bits_per_second = (bytes as f64 / (window_ms as f64 / 1000.0)) * 8.0;

    let mut unit = "bps";
    let mut value = bits_per_second;

    for &(label, size) in UNITS {
        if bits_per_second >= size {
            unit = label;
            value = bits_per_second / size;
        }
    }

    format!("{:.2} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn window(ms: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let t0 = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        (t0, t0 + Duration::milliseconds(ms))
    }

    #[test]
    fn test_zero_window_returns_zero_rate_label() {
        let (t0, _) = window(0);
        assert_eq!(format_rate(1_250_000, t0, t0), "0 bps");
    }

    #[test]
    fn test_negative_window_returns_zero_rate_label() {
        let (t0, t1) = window(1000);
        assert_eq!(format_rate(u64::MAX, t1, t0), "0 bps");
    }

    #[test]
    fn test_zero_bytes_positive_window_is_computed_rate() {
        // A measurable window with no bytes is a real (zero) rate, not the
        // degenerate-window label
        let (t0, t1) = window(3000);
        assert_eq!(format_rate(0, t0, t1), "0.00 bps");
    }

    #[test]
    fn test_ten_megabit_example() {
        let (t0, t1) = window(1000);
        assert_eq!(format_rate(1_250_000, t0, t1), "10.00 Mbps");
    }

    #[test]
    fn test_sub_kilobit_stays_bps() {
        // 124 bytes over 1s = 992 bps, below the Kbps threshold
        let (t0, t1) = window(1000);
        assert_eq!(format_rate(124, t0, t1), "992.00 bps");
    }

    #[test]
    fn test_kilobit_threshold_is_inclusive() {
        // 125 bytes over 1s = exactly 1000 bps
        let (t0, t1) = window(1000);
        assert_eq!(format_rate(125, t0, t1), "1.00 Kbps");
    }

    #[test]
    fn test_largest_qualifying_unit_reconstructs_rate() {
        // 56,250 bytes over 3s = 150,000 bps
        let (t0, t1) = window(3000);
        assert_eq!(format_rate(56_250, t0, t1), "150.00 Kbps");

        // 1.25 GB over 1s = 10 Gbps
        let (t0, t1) = window(1000);
        assert_eq!(format_rate(1_250_000_000, t0, t1), "10.00 Gbps");
    }

    #[test]
    fn test_fractional_window() {
        // 1,250,000 bytes over 500ms = 20 Mbps
        let (t0, t1) = window(500);
        assert_eq!(format_rate(1_250_000, t0, t1), "20.00 Mbps");
    }
}
