//! The preprocessing engine: orchestrates fetch output → extractor →
//! validator → storage for each source, sequentially or fan-out.
//!
//! Failure containment is layered: a bad item becomes an error string on the
//! artifact, a bad source becomes an error status in the batch, and only a
//! batch with at least one failed source returns an error at all.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::extract::{Extractor, ExtractionContext, MarkdownExtractor, file_marker, filter};
use crate::processed::ProcessedStorage;
use crate::settings::Settings;
use crate::types::{ProcessedSource, Source, SourceInfo, SourceType};
use crate::validate::{ItemValidator, deduplicate_by_url};
use crate::{Error, Result};

/// Lifecycle state of one source inside a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    /// Queued or currently running.
    Pending,
    /// Finished with no per-item failures.
    Completed,
    /// Finished, but some items were dropped or flagged.
    CompletedWithErrors,
    /// The source as a whole failed.
    Error,
}

/// Status record for one source in a processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStatus {
    /// Source name.
    pub source_name: String,
    /// Current state.
    pub status: ProcessingState,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When processing finished, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Items that survived validation and cleaning.
    pub items_processed: usize,
    /// Items the extractor emitted.
    pub items_total: usize,
    /// Fatal error for this source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrates extraction, validation and persistence per source.
#[derive(Clone)]
pub struct ProcessingEngine {
    settings: Settings,
    extractors: HashMap<SourceType, Arc<dyn Extractor>>,
    statuses: Arc<Mutex<HashMap<String, ProcessingStatus>>>,
}

impl ProcessingEngine {
    /// Create an engine with the markdown extractor registered for every
    /// implemented source type.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let markdown: Arc<dyn Extractor> = Arc::new(MarkdownExtractor::new());
        let mut extractors: HashMap<SourceType, Arc<dyn Extractor>> = HashMap::new();
        for ty in [
            SourceType::Git,
            SourceType::RedditWiki,
            SourceType::Html,
            SourceType::Rss,
            SourceType::Hn5000,
        ] {
            extractors.insert(ty, Arc::clone(&markdown));
        }
        Self {
            settings,
            extractors,
            statuses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register (or replace) the extractor for a source type.
    pub fn register_extractor(&mut self, source_type: SourceType, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(source_type, extractor);
    }

    /// Process one source end to end and persist its artifact.
    pub async fn process_source(&self, source: &Source) -> Result<()> {
        let started_at = Utc::now();
        self.record_status(ProcessingStatus {
            source_name: source.name.clone(),
            status: ProcessingState::Pending,
            started_at,
            completed_at: None,
            items_processed: 0,
            items_total: 0,
            error: None,
        });

        match self.process_source_inner(source) {
            Ok(outcome) => {
                let status = if outcome.error_count == 0 {
                    ProcessingState::Completed
                } else {
                    ProcessingState::CompletedWithErrors
                };
                info!(
                    name = %source.name,
                    items = outcome.items_processed,
                    errors = outcome.error_count,
                    "processed source"
                );
                self.record_status(ProcessingStatus {
                    source_name: source.name.clone(),
                    status,
                    started_at,
                    completed_at: Some(Utc::now()),
                    items_processed: outcome.items_processed,
                    items_total: outcome.items_total,
                    error: None,
                });
                Ok(())
            },
            Err(e) => {
                warn!(name = %source.name, error = %e, "source failed to process");
                self.record_status(ProcessingStatus {
                    source_name: source.name.clone(),
                    status: ProcessingState::Error,
                    started_at,
                    completed_at: Some(Utc::now()),
                    items_processed: 0,
                    items_total: 0,
                    error: Some(e.to_string()),
                });
                Err(e)
            },
        }
    }

    fn process_source_inner(&self, source: &Source) -> Result<ProcessOutcome> {
        let extractor = self
            .extractors
            .get(&source.source_type)
            .ok_or_else(|| {
                Error::Extraction(format!(
                    "no extractor registered for source type '{}'",
                    source.source_type
                ))
            })?;

        let raw = self.read_raw_content(source)?;
        let ctx = ExtractionContext {
            source_name: source.name.clone(),
            source_type: source.source_type,
        };
        let extraction = extractor.extract(&raw, &ctx)?;
        let items_total = extraction.items.len();
        let mut errors = extraction.errors;

        let validator = ItemValidator::new(
            self.settings.max_description_length,
            self.settings.auto_categorize,
        );
        let mut items = Vec::with_capacity(items_total);
        for raw_item in &extraction.items {
            match validator.validate(raw_item) {
                Ok(()) => items.push(validator.clean(raw_item, &extraction.stats.extractor_used)),
                Err(e) => errors.push(format!("{}: {e}", raw_item.url)),
            }
        }

        if self.settings.deduplicate {
            items = deduplicate_by_url(items);
        }

        let error_count = errors.len();
        let items_processed = items.len();
        let processed = ProcessedSource {
            source: SourceInfo {
                name: source.name.clone(),
                url: source.url.clone(),
                source_type: source.source_type,
                last_updated: source.last_updated,
                version: env!("CARGO_PKG_VERSION").to_string(),
                processed_at: Utc::now(),
                item_count: items_processed,
                errors,
            },
            items,
        };

        let storage = ProcessedStorage::new(&self.settings.cache_dir)?;
        storage.save(&processed)?;

        Ok(ProcessOutcome {
            items_processed,
            items_total,
            error_count,
        })
    }

    /// Process a batch of sources.
    ///
    /// With `parallel_processing` enabled, sources run on a semaphore of
    /// width `max_concurrent_sources`; a failed source never aborts its
    /// siblings. Returns an error naming the failure count when at least one
    /// source failed.
    pub async fn process_all_sources(&self, sources: &[Source]) -> Result<()> {
        let total = sources.len();
        let mut failed = 0usize;

        if self.settings.parallel_processing && total > 1 {
            let semaphore = Arc::new(Semaphore::new(self.settings.effective_concurrency()));
            let mut handles = Vec::with_capacity(total);
            for source in sources {
                let engine = self.clone();
                let source = source.clone();
                let semaphore = Arc::clone(&semaphore);
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire().await;
                    engine.process_source(&source).await
                }));
            }
            for joined in futures::future::join_all(handles).await {
                match joined {
                    Ok(Ok(())) => {},
                    Ok(Err(_)) => failed += 1,
                    Err(e) => {
                        warn!(error = %e, "processing task panicked");
                        failed += 1;
                    },
                }
            }
        } else {
            for source in sources {
                if self.process_source(source).await.is_err() {
                    failed += 1;
                }
            }
        }

        // Best-effort run bookkeeping next to the artifacts.
        if let Ok(storage) = ProcessedStorage::new(&self.settings.cache_dir) {
            let metadata = crate::processed::EngineMetadata {
                last_run: Utc::now(),
                statuses: self.processing_status(),
            };
            if let Err(e) = storage.save_metadata(&metadata) {
                warn!(error = %e, "failed to save processing metadata");
            }
        }

        if failed > 0 {
            return Err(Error::Extraction(format!(
                "{failed} of {total} sources failed to process"
            )));
        }
        Ok(())
    }

    /// A source needs processing when it has no artifact yet, or its cache
    /// directory changed after the artifact was written.
    pub fn needs_processing(&self, source: &Source) -> Result<bool> {
        let storage = ProcessedStorage::new(&self.settings.cache_dir)?;
        if !storage.exists(&source.name) {
            return Ok(true);
        }
        let processed_at: SystemTime = storage.load(&source.name)?.source.processed_at.into();

        let dir = self.settings.source_path(&source.name);
        let Ok(metadata) = fs::metadata(&dir) else {
            return Ok(true);
        };
        let modified = metadata.modified()?;
        Ok(modified > processed_at)
    }

    /// Snapshot of per-source statuses, sorted by name.
    #[must_use]
    pub fn processing_status(&self) -> Vec<ProcessingStatus> {
        let map = self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut statuses: Vec<ProcessingStatus> = map.values().cloned().collect();
        statuses.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        statuses
    }

    fn record_status(&self, status: ProcessingStatus) {
        let mut map = self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.insert(status.source_name.clone(), status);
    }

    /// Read a source's raw content in the form its extractor expects.
    fn read_raw_content(&self, source: &Source) -> Result<Vec<u8>> {
        let dir = self.settings.source_path(&source.name);
        if !dir.exists() {
            return Err(Error::NotFound(format!(
                "cache directory for '{}' does not exist; run update first",
                source.name
            )));
        }

        match source.source_type {
            SourceType::Rss => Ok(fs::read(dir.join("feed.md"))?),
            SourceType::RedditWiki => Ok(fs::read(dir.join("wiki.md"))?),
            _ => read_markdown_tree(&dir),
        }
    }
}

struct ProcessOutcome {
    items_processed: usize,
    items_total: usize,
    error_count: usize,
}

/// Walk a directory tree, filter out non-list files, and join the surviving
/// markdown into one buffer with `<!-- FILE: path -->` separators.
fn read_markdown_tree(dir: &Path) -> Result<Vec<u8>> {
    let mut joined = String::new();
    let mut files = 0usize;

    for entry in WalkDir::new(dir)
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

        let relative = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        let Ok(content) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "skipping unreadable file");
            continue;
        };
        if filter::should_skip(&relative, &content) {
            continue;
        }

        joined.push_str("\n\n");
        joined.push_str(&file_marker(&relative));
        joined.push_str("\n\n");
        joined.push_str(&content);
        files += 1;
    }

    debug!(dir = %dir.display(), files, "assembled markdown tree");
    Ok(joined.into_bytes())
}
