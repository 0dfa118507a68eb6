//! Draining the ledger to offsite storage

use offsite_core::config::{ConfigDir, GeneralConfig};
use offsite_core::{Error, Result};
use std::path::{Path, PathBuf};

use crate::backend::{store_from_config, ObjectStore};
use crate::ledger::{LedgerObserver, SyncKind, SyncLedger};

/// A path whose push or sync failed during [`OffsiteSyncer::run`]
#[derive(Debug)]
pub struct SyncFailure {
    pub kind: SyncKind,
    pub path: String,
    pub error: Error,
}

/// Outcome of one [`OffsiteSyncer::run`]
#[derive(Debug, Default)]
pub struct SyncReport {
    pub pushed: Vec<String>,
    pub synced: Vec<String>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Rejects sync registrations for paths that are not local directories
#[derive(Debug, Clone)]
pub struct SyncTargetCheck {
    root: PathBuf,
}

impl SyncTargetCheck {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LedgerObserver for SyncTargetCheck {
    fn on_register(&self, kind: SyncKind, path: &str) -> Result<()> {
        if kind != SyncKind::Sync {
            return Ok(());
        }

        let full = self.root.join(path);
        if !full.exists() {
            return Err(Error::sync_check(format!(
                "trying to sync a non-existent path: {}",
                path
            )));
        }
        if !full.is_dir() {
            return Err(Error::sync_check(format!(
                "trying to sync a path which is not a directory: {}",
                path
            )));
        }
        Ok(())
    }
}

/// Pushes and syncs every pending ledger path
pub struct OffsiteSyncer {
    root: PathBuf,
    prefix: String,
    store: Box<dyn ObjectStore>,
}

impl OffsiteSyncer {
    /// `prefix` must end with `/`
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>, store: Box<dyn ObjectStore>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            store,
        }
    }

    /// Validate the general configuration and build the configured client
    ///
    /// Settings are checked in order: `root_path`, `s3_uri_prefix`, then the
    /// client-specific setting.
    pub fn from_config(config: &GeneralConfig, config_dir: &ConfigDir) -> Result<Self> {
        let root = config.require_root_path()?.to_path_buf();
        let prefix = config.require_s3_uri_prefix()?;
        let store = store_from_config(config, config_dir)?;
        Ok(Self::new(root, prefix, store))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install the sync-target check on `ledger`
    pub fn watch(&self, ledger: &mut SyncLedger) {
        ledger.subscribe(Box::new(SyncTargetCheck::new(&self.root)));
    }

    /// Process every pending path: pushes first, then syncs
    ///
    /// A failing path is logged, reported and left pending. Only a failure
    /// to read the ledger aborts the run.
    pub fn run(&self, ledger: &mut SyncLedger) -> Result<SyncReport> {
        let current = ledger.current_state()?;
        let mut report = SyncReport::default();

        for path in current.push {
            match self.do_push(&path).and_then(|_| ledger.push_done(&path)) {
                Ok(()) => report.pushed.push(path),
                Err(error) => report.failures.push(self.failure(SyncKind::Push, path, error)),
            }
        }

        for path in current.sync {
            match self.do_sync(&path).and_then(|_| ledger.sync_done(&path)) {
                Ok(()) => report.synced.push(path),
                Err(error) => report.failures.push(self.failure(SyncKind::Sync, path, error)),
            }
        }

        tracing::info!(
            "Offsite sync: {} pushed, {} synced, {} failed",
            report.pushed.len(),
            report.synced.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn failure(&self, kind: SyncKind, path: String, error: Error) -> SyncFailure {
        tracing::warn!("Error while processing: {}: {}", path, error);
        SyncFailure { kind, path, error }
    }

    fn remote(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    /// Copy `root/path` to the remote, recursively for directories
    fn do_push(&self, path: &str) -> Result<()> {
        let local = self.root.join(path);
        tracing::debug!("Pushing {}", local.display());
        self.store.copy(&local, &self.remote(path), local.is_dir())
    }

    /// Mirror `root/path` to the remote, deleting what is gone locally
    fn do_sync(&self, path: &str) -> Result<()> {
        let local = self.root.join(path);
        tracing::debug!("Syncing {}", local.display());
        self.store.mirror(&local, &self.remote(path), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsite_core::config::S3Client;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_checked_in_order() {
        let temp = TempDir::new().unwrap();
        let dir = ConfigDir::new(temp.path());

        let mut config = GeneralConfig::default();
        let err = OffsiteSyncer::from_config(&config, &dir).err().unwrap();
        assert!(err.to_string().contains("root_path"));

        config.root_path = Some(temp.path().to_path_buf());
        let err = OffsiteSyncer::from_config(&config, &dir).err().unwrap();
        assert!(err.to_string().contains("s3_uri_prefix"));

        config.s3_uri_prefix = Some("s3://bucket".to_string());
        let err = OffsiteSyncer::from_config(&config, &dir).err().unwrap();
        assert!(err.to_string().contains("s3cmd_config"));

        config.s3_client = S3Client::Awscli;
        let err = OffsiteSyncer::from_config(&config, &dir).err().unwrap();
        assert!(err.to_string().contains("awscli_profile"));

        config.awscli_profile = Some("backup".to_string());
        let syncer = OffsiteSyncer::from_config(&config, &dir).unwrap();
        assert_eq!(syncer.remote("x/y"), "s3://bucket/x/y");
    }

    #[test]
    fn test_target_check_messages() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file"), "x").unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();
        let check = SyncTargetCheck::new(temp.path());

        assert_eq!(
            check.on_register(SyncKind::Sync, "missing").unwrap_err().to_string(),
            "trying to sync a non-existent path: missing"
        );
        assert_eq!(
            check.on_register(SyncKind::Sync, "file").unwrap_err().to_string(),
            "trying to sync a path which is not a directory: file"
        );
        assert!(check.on_register(SyncKind::Sync, "dir").is_ok());
        assert!(check.on_register(SyncKind::Sync, "").is_ok());
        assert!(check.on_register(SyncKind::Push, "missing").is_ok());
    }
}
