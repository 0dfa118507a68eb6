//! Full-versus-incremental decisions and timestamp collision avoidance

use chrono::NaiveDateTime;
use offsite_core::clock::format_timestamp;
use offsite_core::config::CadenceSettings;
use offsite_core::{Clock, Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Interval between two clock samples while waiting for a fresh second
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the next backup at a destination should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// A new history entry holding a full snapshot
    Full,
    /// Another snapshot merged into the last history entry
    Incremental,
}

/// The most recent history entry at a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastBackup {
    pub name: String,
    /// Time encoded in the entry name
    pub timestamp: NaiveDateTime,
    /// Every snapshot in the entry, the full one first
    pub snapshots: Vec<NaiveDateTime>,
}

impl LastBackup {
    pub fn incremental_count(&self) -> usize {
        self.snapshots.len().saturating_sub(1)
    }

    pub fn latest_snapshot(&self) -> Option<NaiveDateTime> {
        self.snapshots.last().copied()
    }
}

/// Chooses between a full and an incremental backup
pub trait CadenceDecider {
    fn decide(&self, last: Option<&LastBackup>) -> Result<Cadence>;
}

/// Incremental while the last entry has room for more incrementals and is
/// younger than the configured span
pub struct CadencePolicy {
    max_incremental_count: usize,
    max_incremental_span: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl CadencePolicy {
    pub fn new(settings: &CadenceSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let span = settings.span()?;
        let max_incremental_span = chrono::Duration::from_std(span)
            .map_err(|e| Error::time(&settings.max_incremental_span, e.to_string()))?;
        Ok(Self {
            max_incremental_count: settings.max_incremental_count as usize,
            max_incremental_span,
            clock,
        })
    }
}

impl CadenceDecider for CadencePolicy {
    fn decide(&self, last: Option<&LastBackup>) -> Result<Cadence> {
        let Some(last) = last else {
            return Ok(Cadence::Full);
        };

        let age = self.clock.now_seconds() - last.timestamp;
        let cadence = if last.incremental_count() < self.max_incremental_count
            && age < self.max_incremental_span
        {
            Cadence::Incremental
        } else {
            Cadence::Full
        };

        tracing::debug!(
            "Last backup {} has {} incrementals and is {}s old: {:?}",
            last.name,
            last.incremental_count(),
            age.num_seconds(),
            cadence
        );
        Ok(cadence)
    }
}

/// Waits until the clock reaches a second not already used by the history
pub struct TimestampGate {
    clock: Arc<dyn Clock>,
    limit: u32,
}

impl TimestampGate {
    /// `limit` bounds the number of polls before giving up
    pub fn new(clock: Arc<dyn Clock>, limit: u32) -> Self {
        Self { clock, limit }
    }

    /// Sample the clock until the current second is none of `taken`
    pub fn wait_distinct(&self, taken: &[NaiveDateTime]) -> Result<NaiveDateTime> {
        let mut polls = 0;
        loop {
            let now = self.clock.now_seconds();
            if !taken.contains(&now) {
                return Ok(now);
            }
            if polls >= self.limit {
                return Err(Error::ClockStalled {
                    timestamp: format_timestamp(&now),
                    polls,
                });
            }
            self.clock.sleep(POLL_INTERVAL);
            polls += 1;
        }
    }
}
