//! Backup history entries at a destination
//!
//! A history entry is a directory (full snapshot plus incrementals) or an
//! archive file whose name starts with its UTC creation time.

use chrono::NaiveDateTime;
use offsite_core::clock::parse_timestamp;
use offsite_core::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::tools::IncrementalEngine;

static HISTORY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("history name regex is valid")
});

/// Length of the timestamp prefix of a history entry name
const TIMESTAMP_LEN: usize = 19;

pub fn is_history_name(name: &str) -> bool {
    HISTORY_NAME_RE.is_match(name)
}

/// Names of the history entries in `dst`, oldest first
pub fn scan_history(dst: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dst)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if is_history_name(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// The creation time encoded in a history entry name
pub fn history_timestamp(name: &str) -> Result<NaiveDateTime> {
    parse_timestamp(name.get(..TIMESTAMP_LEN).unwrap_or(name))
}

/// One line of `offsite list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListing {
    pub name: String,
    /// Incremental snapshots, the full snapshot excluded
    pub increments: Vec<NaiveDateTime>,
}

/// Every history entry in `dst` with its incrementals
pub fn list_history(dst: &Path, engine: &dyn IncrementalEngine) -> Result<Vec<HistoryListing>> {
    scan_history(dst)?
        .into_iter()
        .map(|name| -> Result<HistoryListing> {
            let path = dst.join(&name);
            let increments = if path.is_dir() {
                engine.list_increments(&path, false)?
            } else {
                Vec::new()
            };
            Ok(HistoryListing { name, increments })
        })
        .collect()
}
