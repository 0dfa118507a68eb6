//! Common test utilities for offsite-backup

#![allow(dead_code)]

use chrono::NaiveDateTime;
use offsite_backup::IncrementalEngine;
use offsite_core::clock::{format_timestamp, parse_timestamp};
use offsite_core::{Clock, Error, ManualClock, Result};
use offsite_sync::SyncRegistrar;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const START: &str = "2016-01-01T12:00:00";

/// Where the fake engine records its snapshot times
const SNAPSHOTS: &str = ".snapshots";

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(START).unwrap())
}

/// Incremental engine that copies the staged files and stamps each commit
/// with the shared clock
///
/// Like the real engine, it refuses two snapshots in the same second.
pub struct CopyEngine {
    clock: Arc<ManualClock>,
}

impl CopyEngine {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self { clock }
    }
}

impl IncrementalEngine for CopyEngine {
    fn commit(&self, source: &Path, dest: &Path) -> Result<()> {
        let now = self.clock.now_seconds();
        let mut snapshots = self.list_increments(dest, true)?;
        if snapshots.last() == Some(&now) {
            return Err(Error::ExternalTool {
                tool: "copy-engine".to_string(),
                code: 1,
            });
        }
        snapshots.push(now);

        for entry in fs::read_dir(source)? {
            let entry = entry?;
            fs::copy(entry.path(), dest.join(entry.file_name()))?;
        }
        let listing: Vec<String> = snapshots.iter().map(format_timestamp).collect();
        fs::write(dest.join(SNAPSHOTS), listing.join("\n"))?;
        Ok(())
    }

    fn list_increments(&self, dest: &Path, include_full: bool) -> Result<Vec<NaiveDateTime>> {
        let content = match fs::read_to_string(dest.join(SNAPSHOTS)) {
            Ok(content) => content,
            Err(_) => return Ok(Vec::new()),
        };
        let mut snapshots = content
            .lines()
            .map(parse_timestamp)
            .collect::<Result<Vec<_>>>()?;
        if !include_full && !snapshots.is_empty() {
            snapshots.remove(0);
        }
        Ok(snapshots)
    }
}

/// Engine whose commits always fail
pub struct FailingEngine;

impl IncrementalEngine for FailingEngine {
    fn commit(&self, _source: &Path, _dest: &Path) -> Result<()> {
        Err(Error::ExternalTool {
            tool: "rdiff-backup".to_string(),
            code: 1,
        })
    }

    fn list_increments(&self, _dest: &Path, _include_full: bool) -> Result<Vec<NaiveDateTime>> {
        Ok(Vec::new())
    }
}

/// Registrar keeping registrations in memory
#[derive(Debug, Default)]
pub struct RecordingRegistrar {
    pub pushed: Vec<String>,
    pub synced: Vec<String>,
    /// Number of upcoming registrations that fail
    pub refuse: usize,
}

impl RecordingRegistrar {
    pub fn refusing(refuse: usize) -> Self {
        Self {
            refuse,
            ..Self::default()
        }
    }

    fn check(&mut self) -> Result<()> {
        if self.refuse > 0 {
            self.refuse -= 1;
            return Err(std::io::Error::other("disk full").into());
        }
        Ok(())
    }
}

impl SyncRegistrar for RecordingRegistrar {
    fn push_path(&mut self, path: &str) -> Result<()> {
        self.check()?;
        self.pushed.push(path.to_string());
        Ok(())
    }

    fn sync_path(&mut self, path: &str) -> Result<()> {
        self.check()?;
        self.synced.push(path.to_string());
        Ok(())
    }
}

/// A root path, a source tree and a staging directory
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            temp: TempDir::new().unwrap(),
        };
        fs::create_dir_all(fixture.root()).unwrap();
        fs::create_dir_all(fixture.staging()).unwrap();
        create_source_tree(&fixture.source());
        fixture
    }

    pub fn root(&self) -> PathBuf {
        self.temp.path().join("root")
    }

    pub fn source(&self) -> PathBuf {
        self.temp.path().join("source")
    }

    pub fn staging(&self) -> PathBuf {
        self.temp.path().join("staging")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }
}

pub fn create_source_tree(base: &Path) {
    fs::create_dir_all(base.join("docs/nested")).unwrap();
    fs::create_dir_all(base.join("empty")).unwrap();
    fs::write(base.join("top.txt"), "top").unwrap();
    fs::write(base.join("docs/a.txt"), "alpha").unwrap();
    fs::write(base.join("docs/nested/b.txt"), "beta").unwrap();
    std::os::unix::fs::symlink("docs/a.txt", base.join("link")).unwrap();
}

/// Relative paths with their file contents or link targets
fn describe_tree(base: &Path) -> Vec<(String, String)> {
    WalkDir::new(base)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry
                .path()
                .strip_prefix(base)
                .unwrap()
                .display()
                .to_string();
            let kind = entry.file_type();
            let content = if kind.is_symlink() {
                format!("-> {}", fs::read_link(entry.path()).unwrap().display())
            } else if kind.is_dir() {
                "dir".to_string()
            } else {
                fs::read_to_string(entry.path()).unwrap()
            };
            (rel, content)
        })
        .collect()
}

pub fn assert_same_tree(expected: &Path, actual: &Path) {
    assert_eq!(describe_tree(expected), describe_tree(actual));
}
