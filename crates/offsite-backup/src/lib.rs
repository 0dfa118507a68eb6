//! Backup flows for offsite
//!
//! Filesystem trees and PostgreSQL dumps are staged, compared with the
//! previous backup and committed into a timestamped history at a
//! destination under the root path. Committed entries are registered with
//! the sync ledger for later upload.

pub mod cadence;
pub mod compare;
pub mod destination;
pub mod flows;
pub mod history;
pub mod ownership;
pub mod tools;
pub mod workdir;

pub use cadence::{Cadence, CadenceDecider, CadencePolicy, LastBackup, TimestampGate};
pub use compare::{ByteComparator, Comparator, RestoreComparator};
pub use destination::Destination;
pub use flows::{
    ArtifactBuilder, BackupJob, BackupKind, BuildOutcome, DatabaseBuilder, FsArchiveBuilder,
    FsIncrementalBuilder, StagedArtifact,
};
pub use history::{list_history, HistoryListing};
pub use ownership::Ownership;
pub use tools::{
    Archiver, DatabaseDumper, DatabaseTarget, IncrementalEngine, RdiffBackup, TarArchiver,
};
pub use workdir::{WorkingDirectory, WorkingDirectoryResolver};
