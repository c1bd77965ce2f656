//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Get the period of a fixed rate loop running at `rate_hz`.
///
/// Returns `None` if the rate is not strictly positive and finite.
pub fn rate_to_period(rate_hz: f64) -> Option<std::time::Duration> {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Some(std::time::Duration::from_secs_f64(1.0 / rate_hz))
    }
    else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_rate_to_period() {
        assert_eq!(
            rate_to_period(4.0),
            Some(std::time::Duration::from_millis(250))
        );
        assert_eq!(rate_to_period(0.0), None);
        assert_eq!(rate_to_period(-1.0), None);
    }
}
