//! Hacker News popular-domain fetcher.
//!
//! Two CSVs make up the dataset: the data file (`domain,score,date`) the
//! source URL points at, and an optional metadata file (`domain,author,bio,
//! topics`) expected next to it under a `-meta.csv` suffix. The two are
//! merged on domain into one markdown list the extractor can consume.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::Fetcher;
use crate::types::Source;
use crate::{Error, Result};

pub(super) async fn add(client: &Fetcher, dir: &Path, source: &Source) -> Result<()> {
    let data_csv = client.get_text(&source.url).await?;

    let meta_csv = match client.get_text(&meta_url_for(&source.url)).await {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(name = %source.name, error = %e, "no metadata CSV, continuing without");
            None
        },
    };

    let markdown = render_domains(&data_csv, meta_csv.as_deref())?;
    fs::create_dir_all(dir)?;
    fs::write(dir.join("hn5000.md"), &markdown)?;
    info!(name = %source.name, bytes = markdown.len(), "wrote hn5000.md");
    Ok(())
}

/// Conventional location of the metadata CSV next to the data CSV.
pub(crate) fn meta_url_for(url: &str) -> String {
    url.strip_suffix(".csv")
        .map_or_else(|| format!("{url}-meta"), |base| format!("{base}-meta.csv"))
}

struct DomainMeta {
    author: String,
    bio: String,
    topics: String,
}

/// Merge the data and metadata CSVs into a markdown list of
/// `[domain](https://domain) - …` lines.
pub(crate) fn render_domains(data: &str, meta: Option<&str>) -> Result<String> {
    let meta_by_domain = meta.map(parse_meta).transpose()?.unwrap_or_default();

    let mut out = String::from("# Hacker News Popular Domains\n\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    for record in reader.records() {
        let record = record.map_err(|e| Error::Parse(format!("bad data CSV row: {e}")))?;
        let Some(domain) = record.get(0).map(str::trim).filter(|d| !d.is_empty()) else {
            continue;
        };
        let score = record.get(1).map(str::trim).unwrap_or("");
        let date = record.get(2).map(str::trim).unwrap_or("");

        let mut line = format!("- [{domain}](https://{domain})");
        if !score.is_empty() {
            line.push_str(&format!(" - score: {score}"));
        }
        if !date.is_empty() {
            line.push_str(&format!(" ({date})"));
        }
        if let Some(m) = meta_by_domain.get(domain) {
            if !m.author.is_empty() {
                line.push_str(&format!(" - by {}", m.author));
            }
            if !m.bio.is_empty() {
                line.push_str(&format!(" - {}", m.bio));
            }
            if !m.topics.is_empty() {
                line.push_str(&format!(" - topics: {}", m.topics));
            }
        }
        out.push_str(&line);
        out.push('\n');
    }

    Ok(out)
}

fn parse_meta(meta: &str) -> Result<HashMap<String, DomainMeta>> {
    let mut by_domain = HashMap::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(meta.as_bytes());

    for record in reader.records() {
        let record = record.map_err(|e| Error::Parse(format!("bad metadata CSV row: {e}")))?;
        let Some(domain) = record.get(0).map(str::trim).filter(|d| !d.is_empty()) else {
            continue;
        };
        by_domain.insert(
            domain.to_string(),
            DomainMeta {
                author: record.get(1).map(str::trim).unwrap_or("").to_string(),
                bio: record.get(2).map(str::trim).unwrap_or("").to_string(),
                topics: record.get(3).map(str::trim).unwrap_or("").to_string(),
            },
        );
    }

    Ok(by_domain)
}
