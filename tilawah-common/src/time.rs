//! Device clock helpers

/// Convert fractional seconds (device clock) to a duration, clamping
/// negative and non-finite values to zero
pub fn seconds_to_duration(seconds: f64) -> std::time::Duration {
    if seconds.is_finite() && seconds > 0.0 {
        std::time::Duration::from_secs_f64(seconds)
    } else {
        std::time::Duration::ZERO
    }
}

/// Format a position in seconds as `m:ss`
pub fn format_position(seconds: f64) -> String {
    let total = seconds_to_duration(seconds).as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
