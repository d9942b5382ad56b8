//! Server duration strings
//!
//! The catalog declares track lengths as `"M:SS"`: minutes of any width,
//! seconds as two zero-padded digits.

/// Parse a server duration string into milliseconds
///
/// Returns `None` for anything that is not `M:SS` with seconds below 60.
/// Callers treat `None` as an unknown duration rather than an error.
pub fn parse_server_duration(value: &str) -> Option<u64> {
    let (minutes, seconds) = value.trim().split_once(':')?;

    if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if seconds.len() != 2 || !seconds.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)
}

/// Format milliseconds as `M:SS`, truncating to whole seconds
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
