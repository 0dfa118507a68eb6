//! Cadence settings and the working-directory configuration file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::span::parse_span;
use crate::utils::{load_yaml_file, load_yaml_file_or_default};

/// Default maximum number of incrementals chained to one full backup
pub const DEFAULT_MAX_INCREMENTAL_COUNT: u32 = 10;

/// Default maximum age of a full backup that still accepts incrementals
pub const DEFAULT_MAX_INCREMENTAL_SPAN: &str = "24h";

/// When to start a new full backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CadenceSettings {
    pub max_incremental_count: u32,
    pub max_incremental_span: String,
}

impl Default for CadenceSettings {
    fn default() -> Self {
        Self {
            max_incremental_count: DEFAULT_MAX_INCREMENTAL_COUNT,
            max_incremental_span: DEFAULT_MAX_INCREMENTAL_SPAN.to_string(),
        }
    }
}

impl CadenceSettings {
    pub fn new(max_incremental_count: u32, max_incremental_span: impl Into<String>) -> Self {
        Self {
            max_incremental_count,
            max_incremental_span: max_incremental_span.into(),
        }
    }

    /// `max_incremental_span` as a duration
    pub fn span(&self) -> Result<Duration> {
        parse_span(&self.max_incremental_span)
    }

    /// Load a per-database settings file; defaults apply when it is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let settings: Self = load_yaml_file_or_default(path)?;
        settings.span()?;
        Ok(settings)
    }
}

/// The flavor of a filesystem backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsBackupType {
    /// Full snapshots with chained incrementals
    #[serde(alias = "rdiff")]
    Incremental,
    /// One self-contained compressed archive per run
    #[serde(alias = "tar")]
    Archive,
}

impl fmt::Display for FsBackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsBackupType::Incremental => write!(f, "incremental"),
            FsBackupType::Archive => write!(f, "archive"),
        }
    }
}

/// Contents of `<working-dir>/config.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkingConfig {
    #[serde(rename = "type")]
    pub backup_type: FsBackupType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_incremental_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_incremental_span: Option<String>,
}

impl WorkingConfig {
    /// The initial configuration written for a new working directory
    pub fn new(backup_type: FsBackupType) -> Self {
        match backup_type {
            FsBackupType::Incremental => Self {
                backup_type,
                max_incremental_count: Some(DEFAULT_MAX_INCREMENTAL_COUNT),
                max_incremental_span: Some(DEFAULT_MAX_INCREMENTAL_SPAN.to_string()),
            },
            FsBackupType::Archive => Self {
                backup_type,
                max_incremental_count: None,
                max_incremental_span: None,
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_yaml_file(path)?;
        config.cadence().span()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Cadence settings with defaults filled in
    pub fn cadence(&self) -> CadenceSettings {
        let defaults = CadenceSettings::default();
        CadenceSettings {
            max_incremental_count: self
                .max_incremental_count
                .unwrap_or(defaults.max_incremental_count),
            max_incremental_span: self
                .max_incremental_span
                .clone()
                .unwrap_or(defaults.max_incremental_span),
        }
    }
}
