//! Fuzzy search over sources, online and preprocessed.
//!
//! Online search walks the raw markdown trees directly with the same AST
//! machinery the structured extractor uses. It needs no preprocessing but
//! pays the parse cost per query. Preprocessed search matches against the
//! JSON artifacts and is the fast path.
//!
//! Both modes share the same result shape, score normalization (top raw
//! score maps to 100) and pagination.

use std::sync::Mutex;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::warn;
use walkdir::WalkDir;

use crate::extract::markdown::{MarkdownWalker, resolve_category};
use crate::extract::{filter, passes_url_gate};
use crate::processed::ProcessedStorage;
use crate::settings::Settings;
use crate::text::{clean_description, clean_markdown};
use crate::types::{SearchResult, Source};
use crate::{Error, Result};

/// A search request shared by the CLI and HTTP surfaces.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// The query text.
    pub query: String,
    /// Restrict to a single source by name.
    pub source: Option<String>,
    /// Restrict to a category (case-insensitive).
    pub category: Option<String>,
    /// Keep at most this many results after normalization.
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Convenience constructor for a bare query.
    #[must_use]
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }
}

/// One page of results plus pagination bookkeeping.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The page's slice of items.
    pub items: Vec<T>,
    /// Total matching results across all pages.
    pub total_results: usize,
    /// Total pages; at least 1 even when empty.
    pub total_pages: usize,
    /// The clipped, 1-based page number actually returned.
    pub current_page: usize,
    /// Page size used.
    pub per_page: usize,
}

/// Boundary validation for query strings: length within the configured
/// bounds and no angle brackets.
pub fn validate_query(query: &str, settings: &Settings) -> Result<()> {
    let length = query.chars().count();
    if length < settings.min_query_length {
        return Err(Error::Validation(format!(
            "query must be at least {} characters",
            settings.min_query_length
        )));
    }
    if length > settings.max_query_length {
        return Err(Error::Validation(format!(
            "query must be at most {} characters",
            settings.max_query_length
        )));
    }
    if query.contains('<') || query.contains('>') {
        return Err(Error::Validation(
            "query contains disallowed characters".into(),
        ));
    }
    Ok(())
}

/// Search the raw markdown trees of enabled sources.
///
/// One worker per source; appends to the shared result list under a mutex.
/// A source that fails to walk logs a warning and contributes nothing.
pub fn search_online(settings: &Settings, query: &SearchQuery) -> Result<Vec<SearchResult>> {
    let sources: Vec<&Source> = settings
        .sources
        .iter()
        .filter(|s| s.enabled)
        .filter(|s| query.source.as_deref().is_none_or(|name| name == s.name))
        .collect();

    let results: Mutex<Vec<SearchResult>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for &source in &sources {
            let results = &results;
            scope.spawn(move || match search_source_tree(settings, source, query) {
                Ok(mut hits) => {
                    if let Ok(mut all) = results.lock() {
                        all.append(&mut hits);
                    }
                },
                Err(e) => warn!(name = %source.name, error = %e, "source search failed"),
            });
        }
    });

    let mut results = results.into_inner().unwrap_or_default();
    retain_category(&mut results, query.category.as_deref());
    normalize_scores(&mut results);
    truncate_to_limit(&mut results, query.limit);
    Ok(results)
}

fn search_source_tree(
    settings: &Settings,
    source: &Source,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>> {
    let dir = settings.source_path(&source.name);
    if !dir.exists() {
        return Err(Error::NotFound(format!(
            "cache directory for '{}' does not exist",
            source.name
        )));
    }

    let matcher = SkimMatcherV2::default();
    let mut walker = MarkdownWalker::new()?;
    let mut results = Vec::new();

    for entry in WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        {
            continue;
        }
        let relative = path.strip_prefix(&dir).unwrap_or(path).to_string_lossy();
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        if filter::should_skip(&relative, &content) {
            continue;
        }

        walker.walk(&content, &mut |event| {
            let url = event.url.trim();
            if !passes_url_gate(url) {
                return;
            }
            let name = event.text.trim();
            if name.chars().count() < 2 {
                return;
            }

            let description = event.paragraph.as_ref().map_or_else(
                || {
                    event
                        .headings
                        .values()
                        .next_back()
                        .map(|h| clean_description(&clean_markdown(h)))
                        .unwrap_or_default()
                },
                |p| clean_description(&clean_markdown(p)),
            );

            let score = [description.as_str(), name]
                .iter()
                .filter_map(|haystack| matcher.fuzzy_match(haystack, &query.query))
                .max();
            let Some(score) = score else {
                return;
            };
            if score < settings.min_fuzzy_score {
                return;
            }

            results.push(SearchResult {
                url: url.to_string(),
                name: name.to_string(),
                description,
                line: event.line,
                score,
                category: resolve_category(event.headings, event.heading_level),
                source: source.name.clone(),
                tags: None,
            });
        })?;
    }

    Ok(results)
}

/// Search the preprocessed artifacts.
pub fn search_processed(settings: &Settings, query: &SearchQuery) -> Result<Vec<SearchResult>> {
    let storage = ProcessedStorage::new(&settings.cache_dir)?;
    let matcher = SkimMatcherV2::default();
    let mut results = Vec::new();

    for processed in storage.load_all()? {
        if let Some(name) = query.source.as_deref() {
            if processed.source.name != name {
                continue;
            }
        }
        for item in &processed.items {
            let haystack = format!("{} {} {}", item.name, item.description, item.tags.join(" "));
            let Some(score) = matcher.fuzzy_match(&haystack, &query.query) else {
                continue;
            };
            if score < settings.min_fuzzy_score {
                continue;
            }
            results.push(SearchResult {
                url: item.url.clone(),
                name: item.name.clone(),
                description: item.description.clone(),
                line: item.metadata.line_number.unwrap_or(0),
                score,
                category: item.category.clone(),
                source: processed.source.name.clone(),
                tags: if item.tags.is_empty() {
                    None
                } else {
                    Some(item.tags.clone())
                },
            });
        }
    }

    retain_category(&mut results, query.category.as_deref());
    normalize_scores(&mut results);
    truncate_to_limit(&mut results, query.limit);
    Ok(results)
}

/// Sort descending by raw score and rescale so the best hit scores 100.
pub fn normalize_scores(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.cmp(&a.score));
    let Some(top) = results.first().map(|r| r.score) else {
        return;
    };
    if top > 0 {
        for result in results.iter_mut() {
            result.score = result.score * 100 / top;
        }
    } else {
        for result in results.iter_mut() {
            result.score = 100;
        }
    }
}

/// Slice `items` into a 1-based page, clipping the page number into range.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = if per_page == 0 { 10 } else { per_page };
    let total_results = items.len();
    let total_pages = std::cmp::max(1, total_results.div_ceil(per_page));
    let current_page = page.clamp(1, total_pages);
    let start = (current_page - 1) * per_page;
    let end = (start + per_page).min(total_results);
    let page_items = if start >= total_results {
        Vec::new()
    } else {
        items[start..end].to_vec()
    };
    Page {
        items: page_items,
        total_results,
        total_pages,
        current_page,
        per_page,
    }
}

fn retain_category(results: &mut Vec<SearchResult>, category: Option<&str>) {
    if let Some(category) = category {
        results.retain(|r| r.category.eq_ignore_ascii_case(category));
    }
}

fn truncate_to_limit(results: &mut Vec<SearchResult>, limit: Option<usize>) {
    if let Some(limit) = limit {
        results.truncate(limit);
    }
}
