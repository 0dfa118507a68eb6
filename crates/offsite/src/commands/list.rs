//! History listing command
//!
//! Listing only reads: it does not take the ledger lock, so it can run
//! while a backup is in progress.

use anyhow::{Context as _, Result};
use offsite_backup::list_history;
use offsite_core::clock::format_timestamp;

use super::Context;
use crate::cli::ListArgs;

pub fn run(ctx: &Context, args: ListArgs) -> Result<()> {
    let dst = match &ctx.config.root_path {
        Some(root) => root.join(&args.dst),
        None => args.dst.into_std_path_buf(),
    };

    let engine = ctx.engine();
    let listing =
        list_history(&dst, &engine).with_context(|| format!("cannot list {}", dst.display()))?;
    for entry in listing {
        println!("{}", entry.name);
        for increment in &entry.increments {
            println!(" {}", format_timestamp(increment));
        }
    }
    Ok(())
}
