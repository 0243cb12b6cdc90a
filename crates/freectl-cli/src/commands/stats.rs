//! `freectl stats` - aggregate statistics over processed artifacts.

use anyhow::Result;
use colored::Colorize;
use freectl_core::stats::{self, SourceStats};
use freectl_core::Settings;

pub fn run(name: Option<&str>, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    let all: Vec<SourceStats> = match name {
        Some(name) => vec![stats::source_stats(&settings, name)?],
        None => stats::all_stats(&settings)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    if all.is_empty() {
        println!("No processed sources. Run 'freectl process' first.");
        return Ok(());
    }

    for stats in &all {
        println!("{}", stats.name.bold());
        println!("  items: {}", stats.item_count);
        println!("  categories: {}", stats.category_count);
        println!("  errors: {}", stats.error_count);
        println!("  processed: {}", stats.processed_at.format("%Y-%m-%d %H:%M"));
        if !stats.top_categories.is_empty() {
            let rendered: Vec<String> = stats
                .top_categories
                .iter()
                .take(5)
                .map(|(category, count)| format!("{category} ({count})"))
                .collect();
            println!("  top categories: {}", rendered.join(", "));
        }
        if !stats.top_domains.is_empty() {
            let rendered: Vec<String> = stats
                .top_domains
                .iter()
                .take(5)
                .map(|(domain, count)| format!("{domain} ({count})"))
                .collect();
            println!("  top domains: {}", rendered.join(", "));
        }
    }
    Ok(())
}
