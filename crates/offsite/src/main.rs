//! offsite CLI - timestamped backups with offsite synchronization
//!
//! This is the main entry point for the offsite command-line interface.

mod cli;
mod commands;
mod output;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

fn main() -> ExitCode {
    // Argument errors exit with status 2 from here
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let verbose = cli.verbose > 0;
    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::fatal(&err, verbose);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing on stderr with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Stdout stays reserved for command output
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
