//! `freectl search` - fuzzy search across sources.

use anyhow::Result;
use colored::Colorize;
use freectl_core::search::{self, SearchQuery};
use freectl_core::Settings;

pub fn run(
    query: &str,
    source: Option<String>,
    category: Option<String>,
    limit: Option<usize>,
    preprocessed: bool,
    json: bool,
) -> Result<()> {
    let settings = Settings::load()?;
    search::validate_query(query, &settings)?;

    let request = SearchQuery {
        query: query.to_string(),
        source,
        category,
        limit,
    };
    let results = if preprocessed {
        search::search_processed(&settings, &request)?
    } else {
        search::search_online(&settings, &request)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for '{query}'.");
        return Ok(());
    }

    for result in &results {
        let mut line = String::new();
        if settings.show_scores {
            line.push_str(&format!("{:>3} ", result.score));
        }
        line.push_str(&format!(
            "{} {} {}",
            result.name.bold(),
            result.url.blue(),
            format!("[{} / {}]", result.source, result.category).dimmed()
        ));
        println!("{line}");
        if !result.description.is_empty() && result.description != result.name {
            println!("      {}", result.description);
        }
    }
    println!("\n{} result(s)", results.len());
    Ok(())
}
