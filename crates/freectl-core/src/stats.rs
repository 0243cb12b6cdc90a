//! Aggregate statistics over processed artifacts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::processed::ProcessedStorage;
use crate::settings::Settings;
use crate::text::extract_domain;
use crate::types::ProcessedSource;
use crate::Result;

/// How many top categories/domains to keep per source.
const TOP_N: usize = 10;

/// Aggregates for one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    /// Source name.
    pub name: String,
    /// Items in the artifact.
    pub item_count: usize,
    /// Distinct categories.
    pub category_count: usize,
    /// Most frequent categories with their counts, descending.
    pub top_categories: Vec<(String, usize)>,
    /// Most frequent link domains with their counts, descending.
    pub top_domains: Vec<(String, usize)>,
    /// Per-item errors recorded during processing.
    pub error_count: usize,
    /// When the artifact was produced.
    pub processed_at: DateTime<Utc>,
}

/// Compute stats for one source's artifact.
pub fn source_stats(settings: &Settings, name: &str) -> Result<SourceStats> {
    let storage = ProcessedStorage::new(&settings.cache_dir)?;
    Ok(stats_of(&storage.load(name)?))
}

/// Compute stats for every artifact on disk.
pub fn all_stats(settings: &Settings) -> Result<Vec<SourceStats>> {
    let storage = ProcessedStorage::new(&settings.cache_dir)?;
    let mut all: Vec<SourceStats> = storage.load_all()?.iter().map(stats_of).collect();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(all)
}

fn stats_of(processed: &ProcessedSource) -> SourceStats {
    let mut categories: HashMap<&str, usize> = HashMap::new();
    let mut domains: HashMap<String, usize> = HashMap::new();

    for item in &processed.items {
        *categories.entry(item.category.as_str()).or_insert(0) += 1;
        let domain = extract_domain(&item.url);
        if !domain.is_empty() {
            *domains.entry(domain.to_string()).or_insert(0) += 1;
        }
    }

    SourceStats {
        name: processed.source.name.clone(),
        item_count: processed.items.len(),
        category_count: categories.len(),
        top_categories: top_n(categories.into_iter().map(|(k, v)| (k.to_string(), v))),
        top_domains: top_n(domains),
        error_count: processed.source.errors.len(),
        processed_at: processed.source.processed_at,
    }
}

fn top_n(counts: impl IntoIterator<Item = (String, usize)>) -> Vec<(String, usize)> {
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(TOP_N);
    sorted
}
