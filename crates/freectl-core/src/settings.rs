//! Typed settings with atomic JSON persistence.
//!
//! Settings live in a single JSON file at `<user_config>/freectl/config.json`
//! and are loaded on every externally-initiated operation rather than cached
//! in a singleton. Saves are atomic (write temp, then rename), so concurrent
//! readers observe either the old or the new file, never a torn one.
//!
//! A missing file materializes defaults and persists them. An unparseable
//! file is logged and defaults are returned in memory; the broken file is
//! deliberately left on disk for the operator to inspect.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::text::sanitize_name;
use crate::types::{Source, SourceType};
use crate::{Error, Result};

const CONFIG_FILE: &str = "config.json";

fn default_min_query_length() -> usize {
    2
}
fn default_max_query_length() -> usize {
    100
}
fn default_search_delay_ms() -> u64 {
    300
}
fn default_show_scores() -> bool {
    true
}
fn default_results_per_page() -> usize {
    10
}
fn default_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FREECTL_CACHE_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    BaseDirs::new().map_or_else(
        || PathBuf::from(".freectl/cache"),
        |dirs| dirs.cache_dir().join("freectl"),
    )
}
fn default_truncate_title_length() -> usize {
    100
}
fn default_min_fuzzy_score() -> i64 {
    0
}
fn default_max_description_length() -> usize {
    500
}
fn default_true() -> bool {
    true
}
fn default_max_concurrent_sources() -> usize {
    4
}

/// Process-wide configuration, persisted as one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Queries shorter than this are rejected at the boundary.
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,
    /// Queries longer than this are rejected at the boundary.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Debounce applied by interactive front-ends, in milliseconds.
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,
    /// Whether front-ends should display normalized scores.
    #[serde(default = "default_show_scores")]
    pub show_scores: bool,
    /// Page size for paginated result sets.
    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,
    /// Root directory for raw source caches and processed artifacts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Whether `update` should run before `process` when sources are stale.
    #[serde(default)]
    pub auto_update: bool,
    /// Display truncation applied by front-ends to long titles.
    #[serde(default = "default_truncate_title_length")]
    pub truncate_title_length: usize,
    /// Free-form banner shown by the web UI.
    #[serde(default)]
    pub custom_header: String,
    /// Fuzzy matches scoring below this are dropped.
    #[serde(default = "default_min_fuzzy_score")]
    pub min_fuzzy_score: i64,
    /// Upper bound for cleaned descriptions, in characters.
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
    /// Infer categories from keywords when headings give nothing.
    #[serde(default = "default_true")]
    pub auto_categorize: bool,
    /// Deduplicate processed items by URL.
    #[serde(default = "default_true")]
    pub deduplicate: bool,
    /// Process sources concurrently.
    #[serde(default = "default_true")]
    pub parallel_processing: bool,
    /// Width of the per-source worker semaphore; `0` falls back to 4.
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
    /// Ordered list of configured sources.
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_query_length: default_min_query_length(),
            max_query_length: default_max_query_length(),
            search_delay_ms: default_search_delay_ms(),
            show_scores: default_show_scores(),
            results_per_page: default_results_per_page(),
            cache_dir: default_cache_dir(),
            auto_update: false,
            truncate_title_length: default_truncate_title_length(),
            custom_header: String::new(),
            min_fuzzy_score: default_min_fuzzy_score(),
            max_description_length: default_max_description_length(),
            auto_categorize: true,
            deduplicate: true,
            parallel_processing: true,
            max_concurrent_sources: default_max_concurrent_sources(),
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Resolve the configuration directory, honoring the
    /// `FREECTL_CONFIG_DIR` override used by tests and scripts.
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("FREECTL_CONFIG_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }
        let base = BaseDirs::new()
            .ok_or_else(|| Error::Config("failed to determine home directory".into()))?;
        Ok(base.config_dir().join("freectl"))
    }

    /// Full path of the settings file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load settings from the default location.
    ///
    /// Missing file: defaults are materialized and persisted. Unparseable
    /// file: the error is logged and defaults are returned without touching
    /// the file on disk.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load settings from an explicit path; see [`Settings::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "settings file missing, writing defaults");
            let settings = Self::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                error!(path = %path.display(), error = %e, "settings file unparseable, using defaults");
                Ok(Self::default())
            },
        }
    }

    /// Persist to the default location, atomically.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Persist to an explicit path, atomically (write temp + rename).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// The cache path a source with this name would occupy.
    #[must_use]
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(sanitize_name(name))
    }

    /// Directory holding processed artifacts.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.cache_dir.join("processed")
    }

    /// Append a new source entry. Rejects duplicate names and source types
    /// without an end-to-end implementation. Does not fetch; see
    /// [`crate::manager::add_source`] for the full flow.
    pub fn add_source(&mut self, url: &str, name: &str, source_type: SourceType) -> Result<Source> {
        if name.trim().is_empty() {
            return Err(Error::Validation("source name cannot be empty".into()));
        }
        if !source_type.is_implemented() {
            return Err(Error::Validation(format!(
                "source type '{source_type}' is not implemented; supported types: git, reddit_wiki, html, rss, hn5000"
            )));
        }
        if self.sources.iter().any(|s| s.name == name) {
            return Err(Error::Conflict(format!("source '{name}' already exists")));
        }

        let source = Source {
            name: name.to_string(),
            path: self.source_path(name).to_string_lossy().into_owned(),
            url: url.to_string(),
            enabled: true,
            source_type,
            last_updated: None,
            size: None,
        };
        self.sources.push(source.clone());
        Ok(source)
    }

    /// Remove the named source entry, returning it.
    pub fn remove_source(&mut self, name: &str) -> Result<Source> {
        let idx = self
            .sources
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(format!("source '{name}' not found")))?;
        Ok(self.sources.remove(idx))
    }

    /// Look up a source by name.
    #[must_use]
    pub fn find_source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Mutable lookup by name.
    pub fn find_source_mut(&mut self, name: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.name == name)
    }

    /// Flip the enabled flag of the named source; returns the new state.
    pub fn toggle_source(&mut self, name: &str) -> Result<bool> {
        let source = self
            .find_source_mut(name)
            .ok_or_else(|| Error::NotFound(format!("source '{name}' not found")))?;
        source.enabled = !source.enabled;
        Ok(source.enabled)
    }

    /// Whether the named source is enabled.
    pub fn is_source_enabled(&self, name: &str) -> Result<bool> {
        self.find_source(name)
            .map(|s| s.enabled)
            .ok_or_else(|| Error::NotFound(format!("source '{name}' not found")))
    }

    /// Effective semaphore width for parallel processing.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrent_sources == 0 {
            default_max_concurrent_sources()
        } else {
            self.max_concurrent_sources
        }
    }
}
