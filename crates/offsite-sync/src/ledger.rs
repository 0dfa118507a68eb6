//! Durable record of what must still be copied offsite
//!
//! The ledger is an append-only text file. Every record is one line:
//!
//! ```text
//! 2016-01-01T12:00:00 +push backups/2016-01-01T12:00:00/
//! 2016-01-01T12:00:05 -push backups/2016-01-01T12:00:00/
//! ```
//!
//! Replaying the file from the start yields the set of paths still pending
//! a push and the set still pending a sync. The file is held under an
//! exclusive advisory lock for the lifetime of a [`SyncLedger`], so only one
//! offsite process mutates it at a time.

use chrono::NaiveDateTime;
use fs4::fs_std::FileExt;
use offsite_core::clock::{format_timestamp, parse_timestamp};
use offsite_core::{Clock, Error, Result};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// What has to happen to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Unconditional copy of a file or directory tree
    Push,
    /// Mirror of a directory, deleting remote objects missing locally
    Sync,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Push => "push",
            SyncKind::Sync => "sync",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "push" => Ok(SyncKind::Push),
            "sync" => Ok(SyncKind::Sync),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

/// Snapshot of the pending work, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub push: Vec<String>,
    pub sync: Vec<String>,
}

impl SyncState {
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && self.sync.is_empty()
    }

    fn set_mut(&mut self, kind: SyncKind) -> &mut Vec<String> {
        match kind {
            SyncKind::Push => &mut self.push,
            SyncKind::Sync => &mut self.sync,
        }
    }

    fn add(&mut self, kind: SyncKind, path: &str) {
        let set = self.set_mut(kind);
        if !set.iter().any(|p| p == path) {
            set.push(path.to_string());
        }
    }

    fn remove(&mut self, kind: SyncKind, path: &str) -> bool {
        let set = self.set_mut(kind);
        match set.iter().position(|p| p == path) {
            Some(index) => {
                set.remove(index);
                true
            }
            None => false,
        }
    }

    fn contains(&self, kind: SyncKind, path: &str) -> bool {
        let set = match kind {
            SyncKind::Push => &self.push,
            SyncKind::Sync => &self.sync,
        };
        set.iter().any(|p| p == path)
    }
}

/// Notified whenever a path is registered for push or sync
///
/// Returning an error vetoes the registration: nothing is written.
pub trait LedgerObserver {
    fn on_register(&self, kind: SyncKind, path: &str) -> Result<()>;
}

/// The capability backup flows need: announcing new artifacts
pub trait SyncRegistrar {
    /// Register `path` (relative to the root) for an unconditional copy
    fn push_path(&mut self, path: &str) -> Result<()>;

    /// Register directory `path` (relative to the root) for mirroring
    fn sync_path(&mut self, path: &str) -> Result<()>;
}

/// One parsed ledger record
#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    timestamp: NaiveDateTime,
    added: bool,
    kind: SyncKind,
    path: String,
}

impl Record {
    fn parse(line: &str, line_no: usize) -> Result<Self> {
        let mut parts = line.splitn(3, ' ');
        let (Some(timestamp), Some(op), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::corrupt_ledger(line_no, "expected three fields"));
        };

        let timestamp = parse_timestamp(timestamp)
            .map_err(|e| Error::corrupt_ledger(line_no, e.to_string()))?;

        let mut chars = op.chars();
        let added = match chars.next() {
            Some('+') => true,
            Some('-') => false,
            _ => {
                return Err(Error::corrupt_ledger(
                    line_no,
                    format!("unknown sign in '{}'", op),
                ))
            }
        };
        let kind = chars
            .as_str()
            .parse::<SyncKind>()
            .map_err(|e| Error::corrupt_ledger(line_no, e))?;

        Ok(Self {
            timestamp,
            added,
            kind,
            path: path.to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{} {}{} {}\n",
            format_timestamp(&self.timestamp),
            if self.added { '+' } else { '-' },
            self.kind,
            self.path
        )
    }
}

/// Exclusively-locked, append-only sync ledger
pub struct SyncLedger {
    path: PathBuf,
    file: File,
    clock: Arc<dyn Clock>,
    /// Replayed lazily on first use
    state: Option<SyncState>,
    last_timestamp: Option<NaiveDateTime>,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl fmt::Debug for SyncLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncLedger")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SyncLedger {
    /// Open (creating if absent) and lock the ledger at `path`
    ///
    /// Fails with [`Error::LockHeld`] without waiting if another process
    /// has the ledger open.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(true) => {}
            Ok(false) => return Err(Error::lock_held(&path)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(Error::lock_held(&path))
            }
            Err(e) => return Err(Error::Io(e)),
        }

        tracing::debug!("Opened sync ledger {}", path.display());

        Ok(Self {
            path,
            file,
            clock,
            state: None,
            last_timestamp: None,
            observers: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register an observer for push/sync registrations
    pub fn subscribe(&mut self, observer: Box<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    /// Snapshot of the pending push and sync sets
    pub fn current_state(&mut self) -> Result<SyncState> {
        Ok(self.state()?.clone())
    }

    /// Mark a pushed path as done
    pub fn push_done(&mut self, path: &str) -> Result<()> {
        self.complete(SyncKind::Push, path)
    }

    /// Mark a synced path as done
    pub fn sync_done(&mut self, path: &str) -> Result<()> {
        self.complete(SyncKind::Sync, path)
    }

    /// Truncate the ledger; refused while anything is pending
    pub fn reset(&mut self) -> Result<()> {
        if !self.state()?.is_empty() {
            return Err(Error::PendingWork);
        }

        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.state = Some(SyncState::default());
        tracing::info!("Reset sync ledger {}", self.path.display());
        Ok(())
    }

    fn register(&mut self, kind: SyncKind, path: &str) -> Result<()> {
        if Path::new(path).is_absolute() || path.contains('\n') {
            return Err(Error::invalid_path(path));
        }
        self.state()?;

        for observer in &self.observers {
            observer.on_register(kind, path)?;
        }

        self.append(true, kind, path)?;
        if let Some(state) = self.state.as_mut() {
            state.add(kind, path);
        }
        tracing::debug!("Registered {} of {:?}", kind, path);
        Ok(())
    }

    fn complete(&mut self, kind: SyncKind, path: &str) -> Result<()> {
        if !self.state()?.contains(kind, path) {
            return Err(Error::not_pending(kind.as_str(), path));
        }

        self.append(false, kind, path)?;
        if let Some(state) = self.state.as_mut() {
            state.remove(kind, path);
        }
        tracing::debug!("Completed {} of {:?}", kind, path);
        Ok(())
    }

    /// Write one record and force it to stable storage
    fn append(&mut self, added: bool, kind: SyncKind, path: &str) -> Result<()> {
        let now = self.clock.now_seconds();
        // Never go back in time, even if the wall clock does
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let record = Record {
            timestamp,
            added,
            kind,
            path: path.to_string(),
        };
        self.file.write_all(record.to_line().as_bytes())?;
        self.file.sync_all()?;
        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    fn state(&mut self) -> Result<&SyncState> {
        if self.state.is_none() {
            let (state, last) = self.replay()?;
            self.last_timestamp = last;
            self.state = Some(state);
        }
        Ok(self.state.get_or_insert_with(SyncState::default))
    }

    fn replay(&self) -> Result<(SyncState, Option<NaiveDateTime>)> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut state = SyncState::default();
        let mut last = None;

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => Error::corrupt_ledger(line_no, e.to_string()),
                _ => Error::from(e),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record = Record::parse(line.trim_end_matches('\r'), line_no)?;
            if record.added {
                state.add(record.kind, &record.path);
            } else if !state.remove(record.kind, &record.path) {
                return Err(Error::corrupt_ledger(
                    line_no,
                    format!("{:?} was not pending a {}", record.path, record.kind),
                ));
            }
            last = Some(record.timestamp);
        }

        tracing::debug!(
            "Replayed sync ledger: {} to push, {} to sync",
            state.push.len(),
            state.sync.len()
        );
        Ok((state, last))
    }
}

impl SyncRegistrar for SyncLedger {
    fn push_path(&mut self, path: &str) -> Result<()> {
        self.register(SyncKind::Push, path)
    }

    fn sync_path(&mut self, path: &str) -> Result<()> {
        self.register(SyncKind::Sync, path)
    }
}
