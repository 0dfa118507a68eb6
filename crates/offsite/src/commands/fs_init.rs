//! Working directory initialization command

use anyhow::Result;

use super::Context;
use crate::cli::FsInitArgs;

pub fn run(ctx: &Context, args: FsInitArgs) -> Result<()> {
    // Serializes initializations against every other command
    let _ledger = ctx.open_ledger()?;

    let working_dir = ctx.resolver().initialize(
        args.src.as_std_path(),
        &args.name,
        args.backup_type.into(),
    )?;
    println!("created {}", working_dir.path().display());
    Ok(())
}
