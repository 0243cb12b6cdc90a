//! freectl CLI - local meta-search over curated link collections.
//!
//! Command implementations live in [`commands`]; this module parses the CLI
//! and dispatches. Exit code 0 on success, non-zero on error (handled by the
//! anyhow boundary in `main`).

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod logging;
mod server;

use cli::{Cli, Commands};
use logging::initialize_logging;

/// Execute the freectl CLI with the current environment.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    match cli.command.clone() {
        Commands::Add {
            url,
            name,
            source_type,
        } => commands::add::run(&url, &name, source_type).await,
        Commands::Delete { name, force } => commands::delete::run(&name, force),
        Commands::List { json } => commands::list::run(json),
        Commands::Update { name } => commands::update::run(name.as_deref()).await,
        Commands::Toggle { name } => commands::toggle::run(&name),
        Commands::Process {
            source,
            force,
            sequential,
        } => commands::process::run(source.as_deref(), force, sequential).await,
        Commands::Search {
            query,
            source,
            category,
            limit,
            preprocessed,
            json,
        } => commands::search::run(
            &query.join(" "),
            source,
            category,
            limit,
            preprocessed,
            json,
        ),
        Commands::Stats { name, json } => commands::stats::run(name.as_deref(), json),
        Commands::Favorites { command } => commands::favorites::run(&command),
        Commands::Serve { port } => server::serve(port).await,
    }
}
