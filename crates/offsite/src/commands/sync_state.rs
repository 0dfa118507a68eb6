//! Sync state inspection command

use anyhow::Result;

use super::Context;
use crate::cli::SyncStateArgs;

pub fn run(ctx: &Context, args: SyncStateArgs) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;

    if args.reset {
        ledger.reset()?;
        println!("The state was reset");
        return Ok(());
    }

    let state = ledger.current_state()?;
    for path in &state.sync {
        println!("Must sync: {}", path);
    }
    for path in &state.push {
        println!("Must push: {}", path);
    }
    Ok(())
}
