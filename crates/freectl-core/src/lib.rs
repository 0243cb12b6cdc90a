//! # freectl-core
//!
//! Core functionality for freectl - a local meta-search engine for
//! link-heavy corpora: curated markdown lists in git repositories, Reddit
//! wiki pages, Hacker News popularity dumps, HTML pages and RSS feeds.
//!
//! ## Pipeline
//!
//! ```text
//! add(url, name, type) ──► fetcher writes  <cache>/<name>/…
//! process(source)      ──► extractor ──► validator ──► <cache>/processed/<name>.json
//! search(query)        ──► raw markdown trees (online) or artifacts (preprocessed)
//! ```
//!
//! The crate is organized around:
//!
//! - **Settings**: one JSON config file, loaded on every boundary entry,
//!   saved atomically
//! - **Source manager**: add/delete/toggle/update lifecycle over settings
//!   plus the on-disk cache
//! - **Extraction**: a multi-strategy markdown link extractor (AST, regex,
//!   bare-URL fallback)
//! - **Validation**: per-item normalization into bounded, tagged records
//! - **Engine**: per-source orchestration with bounded parallel fan-out
//! - **Search**: fuzzy matching with normalized scores and pagination
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use freectl_core::{Settings, SearchQuery, search};
//!
//! let settings = Settings::load()?;
//! let results = search::search_processed(&settings, &SearchQuery::new("koala"))?;
//! for hit in results.iter().take(5) {
//!     println!("{:3} {} ({})", hit.score, hit.name, hit.url);
//! }
//! # Ok::<(), freectl_core::Error>(())
//! ```

/// The preprocessing engine orchestrating extract → validate → store
pub mod engine;
/// Error types and result alias
pub mod error;
/// Pluggable link extractors and strategies
pub mod extract;
/// Favorites store (flat JSON)
pub mod favorites;
/// Per-type source fetchers (git, reddit wiki, HTML, RSS, HN)
pub mod fetcher;
/// Source lifecycle operations
pub mod manager;
/// Atomic per-source artifact storage
pub mod processed;
/// Online and preprocessed fuzzy search
pub mod search;
/// Typed settings with atomic JSON persistence
pub mod settings;
/// Aggregate statistics over artifacts
pub mod stats;
/// Pure text utilities for link and category extraction
pub mod text;
/// Core data structures
pub mod types;
/// Item validation and cleaning
pub mod validate;

pub use engine::{ProcessingEngine, ProcessingState, ProcessingStatus};
pub use error::{Error, Result};
pub use extract::{ExtractionContext, Extractor, MarkdownExtractor};
pub use favorites::FavoritesStore;
pub use fetcher::{Fetcher, SourceFetcher};
pub use manager::UpdateSummary;
pub use processed::{ProcessedStorage, StorageInfo};
pub use search::{Page, SearchQuery};
pub use settings::Settings;
pub use stats::SourceStats;
pub use types::*;
pub use validate::ItemValidator;
