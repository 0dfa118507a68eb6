//! Terminal output utilities

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error as StdError;

/// Name prefixed to fatal error messages
const PROGRAM: &str = "offsite";

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print the causes of an error, one per line
pub fn causes(err: &dyn StdError) {
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

/// Report an error that ends the invocation
pub fn fatal(err: &anyhow::Error, verbose: bool) {
    eprintln!("{}: {}", PROGRAM, err);
    if verbose {
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
    }
}

/// Create a spinner on stderr, hidden when stderr is not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(spinner_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
