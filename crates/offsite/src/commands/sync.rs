//! Offsite synchronization command

use anyhow::Result;
use offsite_sync::{OffsiteSyncer, SyncLedger, SyncRegistrar, SyncReport};

use super::Context;
use crate::cli::SyncArgs;
use crate::output;

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let syncer = ctx.syncer()?;
    let mut ledger = ctx.open_ledger()?;
    syncer.watch(&mut ledger);

    if args.full {
        ledger.sync_path("")?;
    }

    let report = drain(&syncer, &mut ledger)?;
    output::success(&format!(
        "{} pushed, {} synced, {} failed",
        report.pushed.len(),
        report.synced.len(),
        report.failures.len()
    ));
    Ok(())
}

/// Run the syncer and print a block for every path that failed
///
/// Failed paths stay pending and do not fail the command.
pub fn drain(syncer: &OffsiteSyncer, ledger: &mut SyncLedger) -> Result<SyncReport> {
    let pb = output::spinner("Syncing offsite...");
    let report = syncer.run(ledger);
    pb.finish_and_clear();
    let report = report?;

    for failure in &report.failures {
        output::error(&format!("Error while processing: {}", failure.path));
        eprintln!("  {}", failure.error);
        output::causes(&failure.error);
    }
    Ok(report)
}
