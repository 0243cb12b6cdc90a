//! `freectl add` - register a source and fetch its content.

use anyhow::Result;
use colored::Colorize;
use freectl_core::{SourceType, manager};

pub async fn run(url: &str, name: &str, source_type: SourceType) -> Result<()> {
    let source = manager::add_source(url, name, source_type).await?;
    println!(
        "{} {} ({}, {})",
        "Added".green().bold(),
        source.name,
        source.source_type,
        source.url
    );
    Ok(())
}
