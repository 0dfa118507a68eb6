//! Configuration loading and management

mod cadence;
mod general;
mod paths;

pub use cadence::{
    CadenceSettings, FsBackupType, WorkingConfig, DEFAULT_MAX_INCREMENTAL_COUNT,
    DEFAULT_MAX_INCREMENTAL_SPAN,
};
pub use general::{
    GeneralConfig, S3Client, ToolCommand, ToolsConfig, DEFAULT_TIMESTAMP_WAIT_LIMIT,
    ENV_LOG_SYNC, ENV_S3_SERVER,
};
pub use paths::{ConfigDir, DEFAULT_DIR_NAME};
