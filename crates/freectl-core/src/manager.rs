//! Source lifecycle: add, delete, toggle, update, list.
//!
//! Settings are the single source of truth for which sources exist;
//! reconciliation with the on-disk cache happens here. Every operation loads
//! settings fresh and saves atomically, so concurrent CLI/HTTP invocations
//! see consistent snapshots.

use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use url::Url;
use walkdir::WalkDir;

use crate::fetcher::SourceFetcher;
use crate::settings::Settings;
use crate::types::{Source, SourceType};
use crate::{Error, Result};

/// Outcome of a batch update run.
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    /// Sources updated successfully.
    pub updated: usize,
    /// Sources that failed to update.
    pub failed: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

/// Add a source: record it in settings, then fetch its content.
///
/// The settings entry is written before the fetch so a crash mid-fetch still
/// leaves a visible (retriable) source; a *failed* fetch rolls the entry
/// back so settings never accumulate sources that have never worked.
pub async fn add_source(url: &str, name: &str, source_type: SourceType) -> Result<Source> {
    if url.trim().is_empty() {
        return Err(Error::Validation("source URL cannot be empty".into()));
    }
    Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("'{url}': {e}")))?;

    let mut settings = Settings::load()?;
    let source = settings.add_source(url, name, source_type)?;
    settings.save()?;

    let fetcher = SourceFetcher::new()?;
    let dir = settings.source_path(name);
    if let Err(e) = fetcher.add(&dir, &source).await {
        warn!(name, error = %e, "fetch failed, rolling back source");
        let mut settings = Settings::load()?;
        if settings.remove_source(name).is_ok() {
            settings.save()?;
        }
        return Err(e);
    }

    let mut settings = Settings::load()?;
    if let Some(stored) = settings.find_source_mut(name) {
        stored.last_updated = Some(Utc::now());
        stored.size = Some(directory_size(&dir));
    }
    settings.save()?;

    info!(name, url, r#type = %source_type, "source added");
    settings
        .find_source(name)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("source '{name}' vanished after add")))
}

/// Delete a source's cache directory and settings entry.
///
/// Without `force`, a cache-removal failure aborts and the settings entry
/// stays. With `force`, the settings entry is removed no matter what state
/// the cache is in.
pub fn delete_source(name: &str, force: bool) -> Result<()> {
    let mut settings = Settings::load()?;
    if settings.find_source(name).is_none() {
        return Err(Error::NotFound(format!("source '{name}' not found")));
    }

    let dir = settings.source_path(name);
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(&dir) {
            if force {
                warn!(name, error = %e, "failed to remove cache, deleting settings entry anyway");
            } else {
                return Err(Error::Io(e));
            }
        }
    }

    // Drop the processed artifact too, so deleted sources stop surfacing in
    // preprocessed search.
    match crate::processed::ProcessedStorage::new(&settings.cache_dir) {
        Ok(storage) => {
            if storage.exists(name) {
                if let Err(e) = storage.delete(name) {
                    warn!(name, error = %e, "failed to remove processed artifact");
                }
            }
        },
        Err(e) => warn!(name, error = %e, "failed to open processed storage"),
    }

    settings.remove_source(name)?;
    settings.save()?;
    info!(name, "source deleted");
    Ok(())
}

/// List all configured sources.
pub fn list_sources() -> Result<Vec<Source>> {
    Ok(Settings::load()?.sources)
}

/// Flip a source's enabled flag; returns the new state.
pub fn toggle_source(name: &str) -> Result<bool> {
    let mut settings = Settings::load()?;
    let enabled = settings.toggle_source(name)?;
    settings.save()?;
    info!(name, enabled, "source toggled");
    Ok(enabled)
}

/// Whether the named source is enabled.
pub fn is_source_enabled(name: &str) -> Result<bool> {
    Settings::load()?.is_source_enabled(name)
}

/// Update enabled sources, optionally restricted to one by name.
///
/// Per-source failures are logged and counted; they never abort the batch.
pub async fn update_sources(only: Option<&str>) -> Result<UpdateSummary> {
    let started = Instant::now();
    let settings = Settings::load()?;

    let targets: Vec<Source> = settings
        .sources
        .iter()
        .filter(|s| s.enabled)
        .filter(|s| only.is_none_or(|name| name == s.name))
        .cloned()
        .collect();
    if targets.is_empty() {
        if let Some(name) = only {
            return Err(Error::NotFound(format!(
                "no enabled source named '{name}'"
            )));
        }
        return Ok(UpdateSummary::default());
    }

    let fetcher = SourceFetcher::new()?;
    let mut summary = UpdateSummary::default();

    for source in &targets {
        let dir = settings.source_path(&source.name);
        match fetcher.update(&dir, source).await {
            Ok(()) => {
                summary.updated += 1;
                let mut settings = Settings::load()?;
                if let Some(stored) = settings.find_source_mut(&source.name) {
                    stored.last_updated = Some(Utc::now());
                    stored.size = Some(directory_size(&dir));
                }
                settings.save()?;
            },
            Err(e) => {
                warn!(name = %source.name, error = %e, "update failed");
                summary.failed += 1;
            },
        }
    }

    summary.duration_ms = started.elapsed().as_millis();
    info!(
        updated = summary.updated,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "update finished"
    );
    Ok(summary)
}

/// Total size in bytes of all files under `dir`.
#[must_use]
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directory_size_sums_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "12345").unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b"), "123").unwrap();
        assert_eq!(directory_size(dir.path()), 8);
    }

    #[test]
    fn directory_size_of_missing_dir_is_zero() {
        assert_eq!(directory_size(Path::new("/definitely/not/here")), 0);
    }
}
