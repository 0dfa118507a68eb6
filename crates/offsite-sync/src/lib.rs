//! # offsite-sync
//!
//! Tracks which backup artifacts still need to go offsite and sends them:
//! - [`SyncLedger`]: append-only, exclusively locked record of pending
//!   push and sync work, replayed into the current state on demand
//! - [`OffsiteSyncer`]: drains the ledger through an [`ObjectStore`],
//!   isolating per-path failures
//! - `s3cmd` and `aws` command-line clients

pub mod backend;
pub mod ledger;
pub mod syncer;

pub use backend::{store_from_config, AwsCliStore, ObjectStore, S3CmdStore};
pub use ledger::{LedgerObserver, SyncKind, SyncLedger, SyncRegistrar, SyncState};
pub use syncer::{OffsiteSyncer, SyncFailure, SyncReport, SyncTargetCheck};
