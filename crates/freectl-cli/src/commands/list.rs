//! `freectl list` - tabular or JSON listing of configured sources.

use anyhow::Result;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use freectl_core::manager;

pub fn run(json: bool) -> Result<()> {
    let sources = manager::list_sources()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("No sources configured. Add one with 'freectl add'.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Type", "Enabled", "Last updated", "Size", "URL"]);
    for source in &sources {
        table.add_row(vec![
            source.name.clone(),
            source.source_type.to_string(),
            if source.enabled { "yes" } else { "no" }.to_string(),
            source
                .last_updated
                .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            source.size.map_or_else(|| "-".to_string(), human_size),
            source.url.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
