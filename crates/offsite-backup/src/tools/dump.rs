use flate2::write::GzEncoder;
use flate2::Compression;
use offsite_core::config::{ToolCommand, ToolsConfig};
use offsite_core::{Error, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::Stdio;

use crate::compare::{ByteComparator, Comparator, RestoreComparator};

/// Reserved for the cluster-wide dump
const GLOBAL_NAME: &str = "global";

/// Which database a `db` backup covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Cluster-wide objects (roles, tablespaces)
    Global,
    Named(String),
}

impl DatabaseTarget {
    /// Validate the `-g` flag against an optional database name
    pub fn from_args(global: bool, name: Option<&str>) -> Result<Self> {
        match (global, name) {
            (true, Some(_)) => Err(Error::invalid_database(
                "-g (--global) cannot be used with a database name",
            )),
            (false, None) => Err(Error::invalid_database(
                "either -g (--global) or a database name must be specified",
            )),
            (false, Some(GLOBAL_NAME)) => Err(Error::invalid_database(
                "the name 'global' cannot be used as a database name: \
                 either modify this software or rename your database",
            )),
            (true, None) => Ok(Self::Global),
            (false, Some(name)) => Ok(Self::Named(name.to_string())),
        }
    }

    /// Base name of the settings file under `db/`
    pub fn config_name(&self) -> &str {
        match self {
            Self::Global => GLOBAL_NAME,
            Self::Named(name) => name,
        }
    }

    /// Name of the staged dump file
    pub fn dump_file_name(&self) -> String {
        match self {
            Self::Global => "global.sql.gz".to_string(),
            Self::Named(name) => format!("{}.dump", name),
        }
    }
}

/// Runs the PostgreSQL dump tools
#[derive(Debug, Clone)]
pub struct DatabaseDumper {
    dump: ToolCommand,
    dump_all: ToolCommand,
    restore: ToolCommand,
}

impl DatabaseDumper {
    pub fn new(dump: ToolCommand, dump_all: ToolCommand, restore: ToolCommand) -> Self {
        Self {
            dump,
            dump_all,
            restore,
        }
    }

    pub fn from_tools(tools: &ToolsConfig) -> Self {
        Self::new(
            tools.pg_dump.clone(),
            tools.pg_dumpall.clone(),
            tools.pg_restore.clone(),
        )
    }

    /// Dump `target` into `out`
    pub fn dump(&self, target: &DatabaseTarget, out: &Path) -> Result<()> {
        match target {
            DatabaseTarget::Global => self.dump_global(out),
            DatabaseTarget::Named(name) => self.dump_named(name, out),
        }
    }

    /// How two dumps of `target` are compared
    ///
    /// Custom-format dumps embed their creation time, so they are compared
    /// through their restored SQL rather than byte for byte.
    pub fn comparator(&self, target: &DatabaseTarget) -> Box<dyn Comparator> {
        match target {
            DatabaseTarget::Global => Box::new(ByteComparator),
            DatabaseTarget::Named(_) => Box::new(RestoreComparator::new(self.restore.clone())),
        }
    }

    /// Gzip the cluster-wide SQL dump
    fn dump_global(&self, out: &Path) -> Result<()> {
        let tool = &self.dump_all;
        let mut child = tool
            .command()
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Error::tool_spawn(tool.name(), e))?;

        let copied = (|| -> Result<()> {
            let mut stdout = child
                .stdout
                .take()
                .ok_or_else(|| Error::Io(io::Error::other("dump output not captured")))?;
            let file = BufWriter::new(File::create(out)?);
            // Default gzip headers carry no mtime, so equal dumps compress equally
            let mut encoder = GzEncoder::new(file, Compression::default());
            io::copy(&mut stdout, &mut encoder)?;
            encoder.finish()?.flush()?;
            Ok(())
        })();

        if copied.is_err() {
            let _ = child.kill();
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(Error::external_tool(tool.name(), status));
        }
        copied
    }

    /// Custom-format dump of one database
    fn dump_named(&self, name: &str, out: &Path) -> Result<()> {
        let tool = &self.dump;
        let file = File::create(out)?;
        let status = tool
            .command()
            .arg(name)
            .stdout(Stdio::from(file))
            .status()
            .map_err(|e| Error::tool_spawn(tool.name(), e))?;
        if !status.success() {
            return Err(Error::external_tool(tool.name(), status));
        }
        Ok(())
    }
}
