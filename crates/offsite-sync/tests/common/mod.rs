//! Common test utilities for offsite-sync

#![allow(dead_code)]

use offsite_core::{Error, ManualClock, Result};
use offsite_sync::{ObjectStore, SyncLedger};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const START: &str = "2016-01-01T12:00:00";
pub const PREFIX: &str = "s3://bucket/";

/// Which store operation was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Copy { remote: String, recursive: bool },
    Mirror { remote: String, delete: bool },
}

/// Object store that records calls and fails for selected remote paths
#[derive(Clone, Default)]
pub struct MockStore {
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any operation whose remote is `PREFIX + path`
    pub fn fail_on(&self, path: &str) {
        self.failing
            .lock()
            .unwrap()
            .push(format!("{}{}", PREFIX, path));
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, remote: &str) -> Result<()> {
        if self.failing.lock().unwrap().iter().any(|f| f == remote) {
            return Err(Error::ExternalTool {
                tool: "s3cmd".to_string(),
                code: 1,
            });
        }
        Ok(())
    }
}

impl ObjectStore for MockStore {
    fn copy(&self, _local: &Path, remote: &str, recursive: bool) -> Result<()> {
        self.calls.lock().unwrap().push(StoreCall::Copy {
            remote: remote.to_string(),
            recursive,
        });
        self.check(remote)
    }

    fn mirror(&self, _local: &Path, remote: &str, delete_extraneous: bool) -> Result<()> {
        self.calls.lock().unwrap().push(StoreCall::Mirror {
            remote: remote.to_string(),
            delete: delete_extraneous,
        });
        self.check(remote)
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(START).unwrap())
}

/// A ledger in a fresh temporary directory
pub fn create_test_ledger() -> (SyncLedger, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let ledger = SyncLedger::open(ledger_path(&temp_dir), clock()).unwrap();
    (ledger, temp_dir)
}

pub fn ledger_path(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join("sync_state")
}

pub fn reopen(ledger: SyncLedger) -> SyncLedger {
    let path = ledger.path().to_path_buf();
    drop(ledger);
    SyncLedger::open(path, clock()).unwrap()
}
