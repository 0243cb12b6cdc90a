//! `freectl delete` - remove a source's cache and settings entry.

use anyhow::Result;
use colored::Colorize;
use freectl_core::manager;

pub fn run(name: &str, force: bool) -> Result<()> {
    manager::delete_source(name, force)?;
    println!("{} {}", "Deleted".red().bold(), name);
    Ok(())
}
