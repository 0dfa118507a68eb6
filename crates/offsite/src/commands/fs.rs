//! Filesystem backup command

use anyhow::Result;
use offsite_backup::{
    ArtifactBuilder, BackupJob, BuildOutcome, CadencePolicy, Destination, FsArchiveBuilder,
    FsIncrementalBuilder,
};
use offsite_core::config::FsBackupType;

use super::Context;
use crate::cli::FsArgs;

pub fn run(ctx: &Context, args: FsArgs) -> Result<()> {
    let syncer = ctx.syncer()?;
    let working_dir = ctx.resolver().require(args.src.as_std_path())?;
    let policy = CadencePolicy::new(&working_dir.config().cadence(), ctx.clock())?;

    ctx.backup_then_sync(&syncer, |ledger| {
        let destination = Destination::prepare(syncer.root(), args.dst.as_std_path())?;
        let engine = ctx.engine();
        let gate = ctx.gate();
        let job = BackupJob::new(&destination, &engine, &policy, &gate).with_owner(args.owner);

        let mut builder: Box<dyn ArtifactBuilder> = match working_dir.backup_type() {
            FsBackupType::Incremental => {
                Box::new(FsIncrementalBuilder::for_working_directory(&working_dir))
            }
            FsBackupType::Archive => Box::new(FsArchiveBuilder::for_working_directory(&working_dir)),
        };

        report(&job.run(builder.as_mut(), ledger)?);
        Ok(())
    })
}

/// Log what a backup job did
pub fn report(outcome: &BuildOutcome) {
    match outcome {
        BuildOutcome::Recorded {
            cadence,
            entry,
            ledger_path,
        } => tracing::info!("{:?} backup recorded in {} ({})", cadence, entry, ledger_path),
        BuildOutcome::Skipped { notice } => tracing::info!("{}", notice),
    }
}
