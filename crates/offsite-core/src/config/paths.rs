//! Layout of the offsite configuration directory

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::get_home_dir;

/// Name of the directory under `$HOME` used when none is given
pub const DEFAULT_DIR_NAME: &str = ".offsite";

const GENERAL_CONFIG_FILE: &str = "config.yaml";
const LEDGER_FILE: &str = "sync_state";
const SYNC_LOG_FILE: &str = "sync.log";
const DATABASE_DIR: &str = "db";

/// The base directory holding general configuration, the sync ledger,
/// database settings and every working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    path: PathBuf,
}

impl ConfigDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.offsite`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(get_home_dir()?.join(DEFAULT_DIR_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn general_config_path(&self) -> PathBuf {
        self.path.join(GENERAL_CONFIG_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.path.join(LEDGER_FILE)
    }

    pub fn sync_log_path(&self) -> PathBuf {
        self.path.join(SYNC_LOG_FILE)
    }

    /// `db/<name>.yaml`
    pub fn database_config_path(&self, name: &str) -> PathBuf {
        self.path.join(DATABASE_DIR).join(format!("{}.yaml", name))
    }

    /// Create the directory if needed
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }
}
