//! General configuration (`<config-dir>/config.yaml`)
//!
//! Values are loaded with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. The YAML file in the configuration directory
//! 3. Environment variables (`OFFSITE_*`)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::paths::ConfigDir;
use crate::error::{Error, Result};
use crate::utils::load_yaml_file_or_default;

/// Environment override for `s3_server`
pub const ENV_S3_SERVER: &str = "OFFSITE_S3_SERVER";

/// Environment override for `log_sync`
pub const ENV_LOG_SYNC: &str = "OFFSITE_LOG_SYNC";

/// Default number of half-second polls when waiting for a fresh timestamp
pub const DEFAULT_TIMESTAMP_WAIT_LIMIT: u32 = 240;

/// Object storage command-line client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum S3Client {
    #[default]
    S3cmd,
    Awscli,
}

/// An external program and its leading arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCommand(Vec<String>);

impl ToolCommand {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn program(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Program base name, used in error messages
    pub fn name(&self) -> &str {
        Path::new(self.program())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_else(|| self.program())
    }

    /// A `Command` preloaded with the program and its leading arguments
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.program());
        cmd.args(self.args());
        cmd
    }
}

/// Programs invoked for the external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub rdiff_backup: ToolCommand,
    pub pg_dump: ToolCommand,
    pub pg_dumpall: ToolCommand,
    pub pg_restore: ToolCommand,
    pub s3cmd: ToolCommand,
    pub aws: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rdiff_backup: ToolCommand::new(["rdiff-backup"]),
            pg_dump: ToolCommand::new(["pg_dump", "-Fc"]),
            pg_dumpall: ToolCommand::new(["pg_dumpall", "-g"]),
            pg_restore: ToolCommand::new(["pg_restore"]),
            s3cmd: ToolCommand::new(["s3cmd"]),
            aws: ToolCommand::new(["aws"]),
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<()> {
        let entries = [
            ("rdiff_backup", &self.rdiff_backup),
            ("pg_dump", &self.pg_dump),
            ("pg_dumpall", &self.pg_dumpall),
            ("pg_restore", &self.pg_restore),
            ("s3cmd", &self.s3cmd),
            ("aws", &self.aws),
        ];
        for (key, tool) in entries {
            if tool.program().is_empty() {
                return Err(Error::invalid_config(format!(
                    "tools.{} must name a program",
                    key
                )));
            }
        }
        Ok(())
    }
}

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Local directory under which every backup destination lives
    pub root_path: Option<PathBuf>,

    /// Remote location mirroring `root_path`
    pub s3_uri_prefix: Option<String>,

    pub s3_client: S3Client,

    /// Configuration file passed to s3cmd
    pub s3cmd_config: Option<PathBuf>,

    /// Profile passed to the AWS CLI
    pub awscli_profile: Option<String>,

    /// Alternative S3 endpoint
    pub s3_server: Option<String>,

    /// Run the storage client verbosely and keep its output in `sync.log`
    pub log_sync: bool,

    pub tools: ToolsConfig,

    pub timestamp_wait_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            s3_uri_prefix: None,
            s3_client: S3Client::default(),
            s3cmd_config: None,
            awscli_profile: None,
            s3_server: None,
            log_sync: false,
            tools: ToolsConfig::default(),
            timestamp_wait_limit: DEFAULT_TIMESTAMP_WAIT_LIMIT,
        }
    }
}

impl GeneralConfig {
    /// Load from the configuration directory; a missing file means defaults
    pub fn load(config_dir: &ConfigDir) -> Result<Self> {
        let config: Self = load_yaml_file_or_default(&config_dir.general_config_path())?;
        let config = config.apply_env_overrides()?;
        config.tools.validate()?;
        Ok(config)
    }

    /// Parse from a YAML string without applying environment overrides
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse general configuration: {}", e)))?;
        config.tools.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(val) = env::var(ENV_S3_SERVER) {
            if !val.is_empty() {
                self.s3_server = Some(val);
            }
        }

        if let Ok(val) = env::var(ENV_LOG_SYNC) {
            self.log_sync = match val.to_ascii_lowercase().as_str() {
                "" | "0" | "false" | "no" => false,
                "1" | "true" | "yes" => true,
                _ => {
                    return Err(Error::invalid_config(format!(
                        "{} must be a boolean",
                        ENV_LOG_SYNC
                    )))
                }
            };
        }

        Ok(self)
    }

    /// The local root, or `ImproperlyConfigured`
    pub fn require_root_path(&self) -> Result<&Path> {
        self.root_path
            .as_deref()
            .ok_or_else(|| Error::improperly_configured("root_path"))
    }

    /// The remote prefix with a trailing `/`, or `ImproperlyConfigured`
    pub fn require_s3_uri_prefix(&self) -> Result<String> {
        let prefix = self
            .s3_uri_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::improperly_configured("s3_uri_prefix"))?;

        if prefix.ends_with('/') {
            Ok(prefix.to_string())
        } else {
            Ok(format!("{}/", prefix))
        }
    }

    pub fn require_s3cmd_config(&self) -> Result<&Path> {
        self.s3cmd_config
            .as_deref()
            .ok_or_else(|| Error::improperly_configured("s3cmd_config"))
    }

    pub fn require_awscli_profile(&self) -> Result<&str> {
        self.awscli_profile
            .as_deref()
            .ok_or_else(|| Error::improperly_configured("awscli_profile"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GeneralConfig::default();
        assert_eq!(config.s3_client, S3Client::S3cmd);
        assert_eq!(config.tools.pg_dumpall.program(), "pg_dumpall");
        assert_eq!(config.tools.pg_dumpall.args(), ["-g".to_string()]);
        assert_eq!(config.timestamp_wait_limit, DEFAULT_TIMESTAMP_WAIT_LIMIT);
    }

    #[test]
    fn test_missing_settings_are_named() {
        let config = GeneralConfig::default();
        assert_eq!(
            config.require_root_path().unwrap_err().to_string(),
            "you must specify root_path in the general configuration"
        );
        assert_eq!(
            config.require_s3_uri_prefix().unwrap_err().to_string(),
            "you must specify s3_uri_prefix in the general configuration"
        );
        assert_eq!(
            config.require_s3cmd_config().unwrap_err().to_string(),
            "you must specify s3cmd_config in the general configuration"
        );
        assert_eq!(
            config.require_awscli_profile().unwrap_err().to_string(),
            "you must specify awscli_profile in the general configuration"
        );
    }

    #[test]
    fn test_prefix_gets_trailing_slash() {
        let config = GeneralConfig::from_yaml("s3_uri_prefix: s3://bucket/backups").unwrap();
        assert_eq!(config.require_s3_uri_prefix().unwrap(), "s3://bucket/backups/");

        let config = GeneralConfig::from_yaml("s3_uri_prefix: s3://bucket/").unwrap();
        assert_eq!(config.require_s3_uri_prefix().unwrap(), "s3://bucket/");
    }

    #[test]
    fn test_tools_override() {
        let config = GeneralConfig::from_yaml(
            "tools:\n  pg_dumpall: [cat, /tmp/dump.sql]\n",
        )
        .unwrap();
        assert_eq!(config.tools.pg_dumpall.name(), "cat");
        assert_eq!(config.tools.pg_dump.program(), "pg_dump");
    }

    #[test]
    fn test_empty_tool_rejected() {
        assert!(GeneralConfig::from_yaml("tools:\n  s3cmd: []\n").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(GeneralConfig::from_yaml("root: /srv").is_err());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        env::remove_var(ENV_S3_SERVER);
        env::remove_var(ENV_LOG_SYNC);
        let config = GeneralConfig::load(&ConfigDir::new(temp.path())).unwrap();
        assert_eq!(config, GeneralConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let dir = ConfigDir::new(temp.path());
        fs::write(
            dir.general_config_path(),
            "root_path: /srv/backups\ns3_server: s3.example.com\n",
        )
        .unwrap();

        env::set_var(ENV_S3_SERVER, "minio.local:9000");
        env::set_var(ENV_LOG_SYNC, "1");
        let config = GeneralConfig::load(&dir);
        env::remove_var(ENV_S3_SERVER);
        env::remove_var(ENV_LOG_SYNC);

        let config = config.unwrap();
        assert_eq!(config.s3_server.as_deref(), Some("minio.local:9000"));
        assert!(config.log_sync);
        assert_eq!(config.require_root_path().unwrap(), Path::new("/srv/backups"));
    }

    #[test]
    #[serial]
    fn test_bad_log_sync_env() {
        let temp = TempDir::new().unwrap();
        env::set_var(ENV_LOG_SYNC, "maybe");
        let result = GeneralConfig::load(&ConfigDir::new(temp.path()));
        env::remove_var(ENV_LOG_SYNC);
        assert!(result.is_err());
    }
}
