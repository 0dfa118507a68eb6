//! Object storage clients
//!
//! The syncer never speaks the storage protocol itself. It drives a
//! command-line client through the [`ObjectStore`] trait.

mod awscli;
mod s3cmd;

pub use awscli::AwsCliStore;
pub use s3cmd::S3CmdStore;

use offsite_core::config::{ConfigDir, GeneralConfig, S3Client, ToolCommand};
use offsite_core::{Error, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Copy and mirror operations against remote storage
pub trait ObjectStore {
    /// Copy `local` to `remote`; `recursive` for directory trees
    fn copy(&self, local: &Path, remote: &str, recursive: bool) -> Result<()>;

    /// Make `remote` match directory `local`
    fn mirror(&self, local: &Path, remote: &str, delete_extraneous: bool) -> Result<()>;
}

/// Build the client selected by `s3_client`
pub fn store_from_config(
    config: &GeneralConfig,
    config_dir: &ConfigDir,
) -> Result<Box<dyn ObjectStore>> {
    let log = config.log_sync.then(|| config_dir.sync_log_path());
    Ok(match config.s3_client {
        S3Client::S3cmd => Box::new(S3CmdStore::new(
            config.tools.s3cmd.clone(),
            config.require_s3cmd_config()?,
            config.s3_server.clone(),
            log,
        )),
        S3Client::Awscli => Box::new(AwsCliStore::new(
            config.tools.aws.clone(),
            config.require_awscli_profile()?,
            config.s3_server.clone(),
            log,
        )),
    })
}

/// Run a storage client to completion
///
/// With a log file the client's output is appended to it; otherwise the
/// client inherits our standard streams.
fn run_client(tool: &ToolCommand, args: &[String], log: Option<&PathBuf>) -> Result<()> {
    let mut cmd: Command = tool.command();
    cmd.args(args);

    if let Some(log) = log {
        let out = OpenOptions::new().create(true).append(true).open(log)?;
        let err = out.try_clone()?;
        cmd.stdout(Stdio::from(out)).stderr(Stdio::from(err));
    }

    tracing::debug!("Running {} {}", tool.program(), args.join(" "));
    let status = cmd
        .status()
        .map_err(|e| Error::tool_spawn(tool.name(), e))?;
    if !status.success() {
        return Err(Error::external_tool(tool.name(), status));
    }
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
