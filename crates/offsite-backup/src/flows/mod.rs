//! Backup flows: stage a payload, then commit it or skip it
//!
//! Every flow goes `Staging -> Committing -> Recorded | Skipped`. The
//! flow-specific part is the [`ArtifactBuilder`]; [`BackupJob`] owns the
//! shared commit logic and picks the commit strategy from
//! [`BackupKind`].

mod database;
mod fs_archive;
mod fs_incremental;

pub use database::DatabaseBuilder;
pub use fs_archive::FsArchiveBuilder;
pub use fs_incremental::FsIncrementalBuilder;

use chrono::NaiveDateTime;
use offsite_core::clock::format_timestamp;
use offsite_core::Result;
use offsite_sync::SyncRegistrar;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cadence::{Cadence, CadenceDecider, LastBackup, TimestampGate};
use crate::compare::Comparator;
use crate::destination::Destination;
use crate::history::{history_timestamp, scan_history};
use crate::ownership::{chown_if, chown_tree_if, Ownership};
use crate::tools::IncrementalEngine;

/// Suffix of archive history entries
pub const ARCHIVE_EXTENSION: &str = "tgz";

const NO_CHANGE: &str = "no change in the data to be backed up";

/// The backup flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// Filesystem tree committed through the incremental engine
    FsIncremental,
    /// Filesystem tree stored as one compressed archive per run
    FsArchive,
    /// Database dump committed through the incremental engine
    Database,
}

/// A payload ready to be committed
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    pub file: PathBuf,
    /// Name of the payload inside a history entry
    pub file_name: String,
    /// Directory holding nothing but the payload
    pub staging_dir: PathBuf,
}

/// Produces the payload of one flow
pub trait ArtifactBuilder {
    fn kind(&self) -> BackupKind;

    fn stage(&mut self) -> Result<StagedArtifact>;

    /// How the payload is compared to the previous one
    fn comparator(&self) -> &dyn Comparator;
}

/// Result of [`BackupJob::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Recorded {
        cadence: Cadence,
        /// History entry name at the destination
        entry: String,
        /// Path registered with the sync ledger
        ledger_path: String,
    },
    Skipped {
        notice: String,
    },
}

/// Commits staged payloads into a destination's history
pub struct BackupJob<'a> {
    destination: &'a Destination,
    engine: &'a dyn IncrementalEngine,
    decider: &'a dyn CadenceDecider,
    gate: &'a TimestampGate,
    owner: Option<Ownership>,
}

impl<'a> BackupJob<'a> {
    pub fn new(
        destination: &'a Destination,
        engine: &'a dyn IncrementalEngine,
        decider: &'a dyn CadenceDecider,
        gate: &'a TimestampGate,
    ) -> Self {
        Self {
            destination,
            engine,
            decider,
            gate,
            owner: None,
        }
    }

    /// Chown everything the job produces
    pub fn with_owner(mut self, owner: Option<Ownership>) -> Self {
        self.owner = owner;
        self
    }

    pub fn run(
        &self,
        builder: &mut dyn ArtifactBuilder,
        registrar: &mut dyn SyncRegistrar,
    ) -> Result<BuildOutcome> {
        let staged = builder.stage()?;
        tracing::debug!("Staged {}", staged.file.display());
        chown_if(self.owner.as_ref(), &staged.file)?;

        match builder.kind() {
            BackupKind::FsArchive => {
                let outcome = self.commit_archive(&staged, builder.comparator(), registrar);
                // Only a committed archive is moved away from the staging area
                if staged.file.exists() {
                    fs::remove_file(&staged.file)?;
                }
                outcome
            }
            BackupKind::FsIncremental | BackupKind::Database => {
                self.commit_incremental(&staged, builder.comparator(), registrar)
            }
        }
    }

    /// The newest history entry with its snapshots
    fn last_backup(&self) -> Result<Option<LastBackup>> {
        let Some(name) = scan_history(self.destination.path())?.pop() else {
            return Ok(None);
        };
        let timestamp = history_timestamp(&name)?;
        let path = self.destination.entry_path(&name);
        let snapshots = if path.is_dir() {
            self.engine.list_increments(&path, true)?
        } else {
            Vec::new()
        };
        Ok(Some(LastBackup {
            name,
            timestamp,
            snapshots,
        }))
    }

    fn commit_incremental(
        &self,
        staged: &StagedArtifact,
        comparator: &dyn Comparator,
        registrar: &mut dyn SyncRegistrar,
    ) -> Result<BuildOutcome> {
        let last = self.last_backup()?;
        let cadence = self.decider.decide(last.as_ref())?;

        match (cadence, last) {
            (Cadence::Incremental, Some(last)) => {
                let taken = taken_by(&last);
                let now = format_timestamp(&self.gate.wait_distinct(&taken)?);
                let entry = self.destination.entry_path(&last.name);

                if comparator.same(&staged.file, &entry.join(&staged.file_name))? {
                    return self.skip(format!(
                        "{}: {}: skipping creation of new incremental backup",
                        now, NO_CHANGE
                    ));
                }

                // An increment cannot be rolled back, so it is registered first
                let ledger_path = self.destination.ledger_path(&last.name);
                registrar.sync_path(&ledger_path)?;

                // The engine trusts modification times to the second
                touch(&staged.file)?;
                self.engine.commit(&staged.staging_dir, &entry)?;
                chown_tree_if(self.owner.as_ref(), &entry)?;
                tracing::info!("Added incremental backup {} to {}", now, entry.display());
                Ok(BuildOutcome::Recorded {
                    cadence,
                    entry: last.name,
                    ledger_path,
                })
            }
            (_, last) => {
                let taken = last.as_ref().map(taken_by).unwrap_or_default();
                let name = format_timestamp(&self.gate.wait_distinct(&taken)?);

                if let Some(last) = &last {
                    let previous = self.destination.entry_path(&last.name).join(&staged.file_name);
                    if comparator.same(&staged.file, &previous)? {
                        return self.skip(format!(
                            "{}: {}: skipping creation of new full backup",
                            name, NO_CHANGE
                        ));
                    }
                }

                let entry = self.destination.entry_path(&name);
                fs::create_dir(&entry)?;
                let ledger_path = format!("{}/", self.destination.ledger_path(&name));
                let committed = self
                    .engine
                    .commit(&staged.staging_dir, &entry)
                    .and_then(|()| registrar.push_path(&ledger_path));
                if let Err(e) = committed {
                    discard(&entry);
                    return Err(e);
                }
                chown_tree_if(self.owner.as_ref(), &entry)?;
                tracing::info!("Created full backup {}", entry.display());
                Ok(BuildOutcome::Recorded {
                    cadence: Cadence::Full,
                    entry: name,
                    ledger_path,
                })
            }
        }
    }

    fn commit_archive(
        &self,
        staged: &StagedArtifact,
        comparator: &dyn Comparator,
        registrar: &mut dyn SyncRegistrar,
    ) -> Result<BuildOutcome> {
        let last = scan_history(self.destination.path())?.pop();
        let taken = match &last {
            Some(last) => vec![history_timestamp(last)?],
            None => Vec::new(),
        };
        let now = self.gate.wait_distinct(&taken)?;
        let name = format!("{}.{}", format_timestamp(&now), ARCHIVE_EXTENSION);

        if let Some(last) = &last {
            if comparator.same(&staged.file, &self.destination.entry_path(last))? {
                return self.skip(format!("{}: {}: dropping backup", name, NO_CHANGE));
            }
        }

        let entry = self.destination.entry_path(&name);
        move_file(&staged.file, &entry)?;

        let ledger_path = self.destination.ledger_path(&name);
        if let Err(e) = registrar.push_path(&ledger_path) {
            discard(&entry);
            return Err(e);
        }
        chown_if(self.owner.as_ref(), &entry)?;
        tracing::info!("Created archive {}", entry.display());
        Ok(BuildOutcome::Recorded {
            cadence: Cadence::Full,
            entry: name,
            ledger_path,
        })
    }

    fn skip(&self, notice: String) -> Result<BuildOutcome> {
        tracing::info!("{}", notice);
        self.destination.log(&notice, self.owner.as_ref())?;
        Ok(BuildOutcome::Skipped { notice })
    }
}

/// Seconds already used by a history entry
fn taken_by(last: &LastBackup) -> Vec<NaiveDateTime> {
    let mut taken = vec![last.timestamp];
    taken.extend(last.latest_snapshot());
    taken
}

/// Remove a history entry that never made it into the ledger
fn discard(entry: &Path) {
    let removed = if entry.is_dir() {
        fs::remove_dir_all(entry)
    } else {
        fs::remove_file(entry)
    };
    if let Err(e) = removed {
        tracing::warn!("Could not remove {}: {}", entry.display(), e);
    }
}

fn touch(path: &Path) -> Result<()> {
    File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())?;
    Ok(())
}

/// Rename, falling back to copy and delete across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(e.into());
    }
    fs::remove_file(from)?;
    Ok(())
}
