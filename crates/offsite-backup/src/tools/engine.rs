use chrono::{DateTime, NaiveDateTime};
use offsite_core::config::ToolCommand;
use offsite_core::{Error, Result};
use std::path::Path;
use std::process::Stdio;

/// Tool that keeps a full snapshot plus reverse increments in a directory
pub trait IncrementalEngine {
    /// Commit the contents of `source` into the snapshot directory `dest`
    fn commit(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Snapshot times stored in `dest`, oldest first
    ///
    /// The oldest is the full snapshot; it is left out unless
    /// `include_full` is set.
    fn list_increments(&self, dest: &Path, include_full: bool) -> Result<Vec<NaiveDateTime>>;
}

/// `rdiff-backup`
#[derive(Debug, Clone)]
pub struct RdiffBackup {
    tool: ToolCommand,
}

impl RdiffBackup {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    /// Parse `--parsable-output` listing lines: `<epoch-seconds> <kind>`
    fn parse_listing(&self, output: &str) -> Result<Vec<NaiveDateTime>> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let secs = line
                    .split_whitespace()
                    .next()
                    .and_then(|t| t.parse::<i64>().ok())
                    .ok_or_else(|| {
                        Error::time(line, format!("unexpected {} listing", self.tool.name()))
                    })?;
                DateTime::from_timestamp(secs, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| Error::time(line, "timestamp out of range"))
            })
            .collect()
    }
}

impl IncrementalEngine for RdiffBackup {
    fn commit(&self, source: &Path, dest: &Path) -> Result<()> {
        tracing::debug!("{} {} {}", self.tool.name(), source.display(), dest.display());
        let status = self
            .tool
            .command()
            .arg(source)
            .arg(dest)
            .status()
            .map_err(|e| Error::tool_spawn(self.tool.name(), e))?;
        if !status.success() {
            return Err(Error::external_tool(self.tool.name(), status));
        }
        Ok(())
    }

    fn list_increments(&self, dest: &Path, include_full: bool) -> Result<Vec<NaiveDateTime>> {
        let output = self
            .tool
            .command()
            .args(["-l", "--parsable-output"])
            .arg(dest)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Error::tool_spawn(self.tool.name(), e))?;
        if !output.status.success() {
            return Err(Error::external_tool(self.tool.name(), output.status));
        }

        let mut snapshots = self.parse_listing(&String::from_utf8_lossy(&output.stdout))?;
        if !include_full && !snapshots.is_empty() {
            snapshots.remove(0);
        }
        Ok(snapshots)
    }
}
