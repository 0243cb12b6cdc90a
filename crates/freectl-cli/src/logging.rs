//! Logging initialization.
//!
//! Sets up the tracing subscriber based on CLI flags, writing to stderr so
//! stdout stays clean for command output.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;

/// Initialize the logging subsystem from the global CLI flags.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }
    Ok(())
}
