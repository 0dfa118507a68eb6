//! Database backup command

use anyhow::Result;
use offsite_backup::{
    BackupJob, CadencePolicy, DatabaseBuilder, DatabaseDumper, DatabaseTarget, Destination,
};
use offsite_core::config::CadenceSettings;
use std::path::Path;

use super::fs::report;
use super::Context;
use crate::cli::DbArgs;

pub fn run(ctx: &Context, args: DbArgs) -> Result<()> {
    let (name, dst) = args.split();
    let target = DatabaseTarget::from_args(args.global, name)?;
    let settings =
        CadenceSettings::load_or_default(&ctx.config_dir.database_config_path(target.config_name()))?;
    let policy = CadencePolicy::new(&settings, ctx.clock())?;
    let syncer = ctx.syncer()?;

    ctx.backup_then_sync(&syncer, |ledger| {
        let destination = Destination::prepare(syncer.root(), Path::new(dst))?;
        let engine = ctx.engine();
        let gate = ctx.gate();
        let job = BackupJob::new(&destination, &engine, &policy, &gate).with_owner(args.owner);

        let dumper = DatabaseDumper::from_tools(&ctx.config.tools);
        let mut builder = DatabaseBuilder::new(target, dumper)?;
        report(&job.run(&mut builder, ledger)?);
        Ok(())
    })
}
