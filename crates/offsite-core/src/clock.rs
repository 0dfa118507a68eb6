//! Injectable wall clock
//!
//! Everything that stamps or compares backup timestamps reads time through
//! [`Clock`], so tests can drive time forward without sleeping.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};

/// Format used for ledger records and backup history names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of the current UTC time and of sleeping
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;

    /// Block for `duration`
    fn sleep(&self, duration: Duration);

    /// Current time truncated to the second
    fn now_seconds(&self) -> NaiveDateTime {
        self.now().naive_utc().trunc_subsecs(0)
    }
}

/// The real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared handle to the system clock
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to
///
/// `sleep` advances the clock by the requested duration unless the clock
/// was created with [`ManualClock::frozen`].
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    advance_on_sleep: bool,
    sleeps: Mutex<u32>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
            advance_on_sleep: true,
            sleeps: Mutex::new(0),
        }
    }

    /// A clock whose `sleep` never advances time
    pub fn frozen(start: DateTime<Utc>) -> Self {
        Self {
            advance_on_sleep: false,
            ..Self::new(start)
        }
    }

    /// Build a clock from a `YYYY-MM-DDTHH:MM:SS` UTC string
    pub fn at(timestamp: &str) -> Result<Self> {
        Ok(Self::new(parse_timestamp(timestamp)?.and_utc()))
    }

    /// Move time forward
    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    /// Jump to an arbitrary instant, possibly backwards
    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = to;
    }

    /// Number of times `sleep` was called
    pub fn sleep_count(&self) -> u32 {
        *self.sleeps.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        *self.sleeps.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.advance_on_sleep {
            if let Ok(by) = chrono::Duration::from_std(duration) {
                self.advance(by);
            }
        }
    }
}

/// Render a second-resolution timestamp
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a second-resolution timestamp
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| Error::time(value, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::at("2016-01-01T12:00:00").unwrap();
        clock.sleep(Duration::from_millis(500));
        clock.sleep(Duration::from_millis(500));
        assert_eq!(format_timestamp(&clock.now_seconds()), "2016-01-01T12:00:01");
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn test_frozen_clock_does_not_move() {
        let clock = ManualClock::frozen(Utc::now());
        let before = clock.now();
        clock.sleep(Duration::from_secs(10));
        assert_eq!(clock.now(), before);
    }

    #[test]
    fn test_now_seconds_truncates() {
        let clock = ManualClock::at("2016-01-01T12:00:00").unwrap();
        clock.advance(chrono::Duration::milliseconds(999));
        assert_eq!(format_timestamp(&clock.now_seconds()), "2016-01-01T12:00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2016-01-01T12:00:00").is_ok());
    }
}
