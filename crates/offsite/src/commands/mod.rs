//! CLI command implementations

pub mod db;
pub mod fs;
pub mod fs_init;
pub mod list;
pub mod sync;
pub mod sync_state;

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use offsite_backup::{RdiffBackup, TimestampGate, WorkingDirectoryResolver};
use offsite_core::{system_clock, Clock, ConfigDir, GeneralConfig};
use offsite_sync::{OffsiteSyncer, SyncLedger};
use std::sync::Arc;

use crate::cli::{Cli, Commands};

/// Dispatch the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::FsInit(args) => fs_init::run(&ctx, args),
        Commands::Fs(args) => fs::run(&ctx, args),
        Commands::Db(args) => db::run(&ctx, args),
        Commands::List(args) => list::run(&ctx, args),
        Commands::Sync(args) => sync::run(&ctx, args),
        Commands::SyncState(args) => sync_state::run(&ctx, args),
    }
}

/// What every command starts from: the configuration directory and the
/// general configuration loaded from it
pub struct Context {
    pub config_dir: ConfigDir,
    pub config: GeneralConfig,
    clock: Arc<dyn Clock>,
}

impl Context {
    pub fn load(config_dir: Option<&Utf8Path>) -> Result<Self> {
        let config_dir = match config_dir {
            Some(path) => ConfigDir::new(path.as_std_path()),
            None => ConfigDir::default_location()?,
        };
        let config = GeneralConfig::load(&config_dir).map_err(|e| {
            anyhow!(
                "cannot load {}: {}",
                config_dir.general_config_path().display(),
                e
            )
        })?;

        Ok(Self {
            config_dir,
            config,
            clock: system_clock(),
        })
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Validate the remote settings and build the syncer
    pub fn syncer(&self) -> Result<OffsiteSyncer> {
        Ok(OffsiteSyncer::from_config(&self.config, &self.config_dir)?)
    }

    /// Open and lock the sync ledger
    pub fn open_ledger(&self) -> Result<SyncLedger> {
        self.config_dir.ensure()?;
        Ok(SyncLedger::open(
            self.config_dir.ledger_path(),
            self.clock(),
        )?)
    }

    pub fn resolver(&self) -> WorkingDirectoryResolver {
        WorkingDirectoryResolver::new(self.config_dir.path())
    }

    pub fn engine(&self) -> RdiffBackup {
        RdiffBackup::new(self.config.tools.rdiff_backup.clone())
    }

    pub fn gate(&self) -> TimestampGate {
        TimestampGate::new(self.clock(), self.config.timestamp_wait_limit)
    }

    /// Lock the ledger, run `backup`, then drain the ledger offsite
    ///
    /// The ledger is drained even when `backup` fails; the backup error
    /// is returned afterwards.
    pub fn backup_then_sync<F>(&self, syncer: &OffsiteSyncer, backup: F) -> Result<()>
    where
        F: FnOnce(&mut SyncLedger) -> Result<()>,
    {
        let mut ledger = self.open_ledger()?;
        syncer.watch(&mut ledger);

        let backed_up = backup(&mut ledger);
        if let Err(err) = &backed_up {
            tracing::warn!("Backup failed, syncing anyway: {}", err);
        }
        let synced = sync::drain(syncer, &mut ledger);

        backed_up?;
        synced.map(|_| ())
    }
}
