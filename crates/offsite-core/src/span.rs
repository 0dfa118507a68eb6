//! Duration spans such as `24h`, `1h30m` or `0s`

use std::time::Duration;

use crate::error::{Error, Result};

/// Parse a human-readable span
///
/// Accepts everything `humantime` does (`24h`, `1h 30m`, `2weeks`). A bare
/// integer is a number of seconds.
pub fn parse_span(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::time(value, "empty span"));
    }

    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(trimmed).map_err(|e| Error::time(value, e.to_string()))
}
