//! Error types for offsite-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using offsite-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared by the offsite crates
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting is missing from the general configuration
    #[error("you must specify {setting} in the general configuration")]
    ImproperlyConfigured { setting: String },

    /// A configuration value is present but unusable
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another process holds the ledger lock
    #[error("another instance is already running (lock held on {path})")]
    LockHeld { path: PathBuf },

    /// Ledger paths must be relative to the root path
    #[error("paths recorded in the sync state must be relative: {path}")]
    InvalidPath { path: String },

    /// Completion marker for a path that is not pending
    #[error("{path:?} is not pending a {kind}")]
    NotPending { kind: String, path: String },

    /// Reset refused while work is outstanding
    #[error("cannot reset: some files must be synced or pushed")]
    PendingWork,

    /// Unparsable ledger record
    #[error("corrupt sync state at line {line}: {message}")]
    CorruptLedger { line: usize, message: String },

    /// Rejected sync registration
    #[error("{message}")]
    SyncCheck { message: String },

    /// More than one working directory matches a fingerprint
    #[error("duplicate working directories: {}", candidates.join(", "))]
    DuplicateWorkingDirectory { candidates: Vec<String> },

    /// Working directory symlink does not point at the requested source
    #[error("found a working directory with the wrong path: {}", path.display())]
    WrongWorkingDirectory { path: PathBuf },

    /// Initialization found an existing working directory
    #[error("there is already a directory for this path")]
    WorkingDirectoryExists,

    /// No working directory was initialized for a source
    #[error("no working directory for: {source_path}")]
    MissingWorkingDirectory { source_path: String },

    /// Source paths must be absolute
    #[error("the source path must be absolute")]
    RelativeSource,

    /// External tool exited unsuccessfully
    #[error("{tool} exited with code: {code}")]
    ExternalTool { tool: String, code: i32 },

    /// External tool could not be started
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The clock never advanced past a colliding timestamp
    #[error("the clock did not advance past {timestamp} after {polls} polls")]
    ClockStalled { timestamp: String, polls: u32 },

    /// Destination is not under the root path
    #[error("{} is not under the root path {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Bad ownership specification
    #[error("invalid owner specification: {spec}")]
    InvalidOwner { spec: String },

    /// Bad database selection
    #[error("{message}")]
    InvalidDatabase { message: String },

    /// Unparsable timestamp or duration
    #[error("invalid time value {value:?}: {message}")]
    Time { value: String, message: String },
}

impl Error {
    /// Create an improperly configured error for a missing setting
    pub fn improperly_configured(setting: impl Into<String>) -> Self {
        Self::ImproperlyConfigured {
            setting: setting.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a lock held error
    pub fn lock_held(path: impl Into<PathBuf>) -> Self {
        Self::LockHeld { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Create a not pending error
    pub fn not_pending(kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotPending {
            kind: kind.into(),
            path: path.into(),
        }
    }

    /// Create a corrupt ledger error
    pub fn corrupt_ledger(line: usize, message: impl Into<String>) -> Self {
        Self::CorruptLedger {
            line,
            message: message.into(),
        }
    }

    /// Create a sync check error
    pub fn sync_check(message: impl Into<String>) -> Self {
        Self::SyncCheck {
            message: message.into(),
        }
    }

    /// Create an external tool error from an exit status
    pub fn external_tool(tool: impl Into<String>, status: std::process::ExitStatus) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            // Killed by a signal: report like a shell would
            code: status.code().unwrap_or(-1),
        }
    }

    /// Create a tool spawn error
    pub fn tool_spawn(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::ToolSpawn {
            tool: tool.into(),
            source,
        }
    }

    /// Create an invalid owner error
    pub fn invalid_owner(spec: impl Into<String>) -> Self {
        Self::InvalidOwner { spec: spec.into() }
    }

    /// Create an invalid database error
    pub fn invalid_database(message: impl Into<String>) -> Self {
        Self::InvalidDatabase {
            message: message.into(),
        }
    }

    /// Create a time parsing error
    pub fn time(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Time {
            value: value.into(),
            message: message.into(),
        }
    }

    /// True for errors that mean another invocation is in progress
    pub fn is_lock_held(&self) -> bool {
        matches!(self, Self::LockHeld { .. })
    }
}
