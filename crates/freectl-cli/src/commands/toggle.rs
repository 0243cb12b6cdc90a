//! `freectl toggle` - enable or disable a source.

use anyhow::Result;
use colored::Colorize;
use freectl_core::manager;

pub fn run(name: &str) -> Result<()> {
    let enabled = manager::toggle_source(name)?;
    let state = if enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("{name} is now {state}");
    Ok(())
}
