//! Core data structures for the freectl cache and pipeline.
//!
//! Types flow through the pipeline in order: a [`Source`] is fetched into the
//! cache, extractors emit [`RawItem`]s, the validator turns them into
//! [`ProcessedItem`]s, and the engine persists a [`ProcessedSource`] per
//! source. Search produces [`SearchResult`]s over either representation.
//!
//! Serialized shapes are stable: struct field order is the on-disk key order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The kind of corpus a source points at.
///
/// Only a subset is implemented end-to-end; the rest deserialize cleanly from
/// old settings files but are rejected when a new source is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A cloned git repository, typically a curated markdown list.
    Git,
    /// A Reddit wiki page fetched as markdown.
    RedditWiki,
    /// Aggregated Hacker News domain-popularity CSVs.
    Hn5000,
    /// OPML subscription list (declared, not implemented).
    Opml,
    /// Browser bookmarks export (declared, not implemented).
    Bookmarks,
    /// Obsidian vault (declared, not implemented).
    Obsidian,
    /// An arbitrary HTML page converted to markdown.
    Html,
    /// An RSS/Atom feed rendered to markdown.
    Rss,
}

impl SourceType {
    /// True when an end-to-end fetch + extract path exists for this type.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        matches!(
            self,
            Self::Git | Self::RedditWiki | Self::Html | Self::Rss | Self::Hn5000
        )
    }

    /// Stable snake_case identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::RedditWiki => "reddit_wiki",
            Self::Hn5000 => "hn5000",
            Self::Opml => "opml",
            Self::Bookmarks => "bookmarks",
            Self::Obsidian => "obsidian",
            Self::Html => "html",
            Self::Rss => "rss",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "reddit_wiki" => Ok(Self::RedditWiki),
            "hn5000" => Ok(Self::Hn5000),
            "opml" => Ok(Self::Opml),
            "bookmarks" => Ok(Self::Bookmarks),
            "obsidian" => Ok(Self::Obsidian),
            "html" => Ok(Self::Html),
            "rss" => Ok(Self::Rss),
            other => Err(Error::Validation(format!("unknown source type '{other}'"))),
        }
    }
}

/// A named handle to an external corpus cached locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Unique display name; never sanitized in settings.
    pub name: String,
    /// Cache subdirectory for this source (`cache_dir/<sanitized name>`).
    pub path: String,
    /// Where the corpus is fetched from.
    pub url: String,
    /// Disabled sources are skipped by update, process, and search.
    pub enabled: bool,
    /// Corpus kind; decides the fetcher and the raw-content reader.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// When the source was last fetched successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Total bytes under the source's cache directory after the last fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A link record as produced by an extractor strategy, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    /// The extracted link target.
    pub url: String,
    /// Display name (link text, or a derived fallback).
    pub name: String,
    /// Cleaned surrounding text.
    pub description: String,
    /// Raw surrounding paragraph, untouched.
    pub context: String,
    /// The raw line or block the item came from.
    pub raw_text: String,
    /// Ordered ancestor heading texts, outermost first.
    pub heading_context: Vec<String>,
    /// Free-form hints: `file_path`, `line_number`, `category`.
    pub metadata: HashMap<String, String>,
}

/// Extraction provenance attached to every processed item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Path of the file the item was extracted from, relative to the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// 1-based line number within that file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// Ancestor headings at extraction time, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_hierarchy: Option<Vec<String>>,
    /// Name of the extractor/strategy that emitted the item.
    pub extractor_used: String,
    /// Heuristic quality score in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Deepest heading the item sat under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<String>,
}

/// A normalized link record, ready for storage and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedItem {
    /// 16-hex-char content id derived from url, name and description.
    pub id: String,
    /// Normalized URL (no fragment, no trailing slash).
    pub url: String,
    /// Display name, at most 200 characters.
    pub name: String,
    /// Cleaned description, bounded by the configured maximum.
    pub description: String,
    /// Resolved category.
    pub category: String,
    /// Second-to-last heading, when the hierarchy was deep enough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Lowercased, deduplicated tags; at most ten.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Raw surrounding paragraph, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    /// The raw extracted text, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// When the item was extracted.
    pub extracted_at: DateTime<Utc>,
    /// Extraction provenance.
    pub metadata: ItemMetadata,
}

/// Metadata block of a processed artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Source name as it appears in settings.
    pub name: String,
    /// Source URL at processing time.
    pub url: String,
    /// Source kind.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Last successful fetch, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Version of the tool that produced the artifact.
    pub version: String,
    /// When processing completed.
    pub processed_at: DateTime<Utc>,
    /// Number of items in the artifact.
    pub item_count: usize,
    /// Per-item failures collected during processing; never fatal.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// The atomic on-disk unit produced by the preprocessing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSource {
    /// Artifact metadata.
    pub source: SourceInfo,
    /// Ordered, optionally URL-deduplicated items.
    pub items: Vec<ProcessedItem>,
}

/// A user-pinned link. Uniqueness key is `link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// The pinned URL.
    pub link: String,
    /// Display name.
    pub name: String,
    /// Optional description carried over from the search result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional category carried over from the search result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Source the link was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A single search hit, shared by the online and preprocessed paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched link.
    pub url: String,
    /// Display name of the link.
    pub name: String,
    /// Description or surrounding context.
    pub description: String,
    /// Line number within the originating file; internal bookkeeping.
    #[serde(skip)]
    pub line: usize,
    /// Normalized score in `[0, 100]` after [`crate::search::normalize_scores`];
    /// the raw fuzzy score before.
    pub score: i64,
    /// Resolved category of the hit.
    pub category: String,
    /// Name of the source the hit came from.
    pub source: String,
    /// Tags, present only for preprocessed hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Outcome of one extractor run over a source's raw content.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Extracted items, in discovery order.
    pub items: Vec<RawItem>,
    /// Per-item failures; collected, never fatal.
    pub errors: Vec<String>,
    /// Bookkeeping about the run.
    pub stats: ExtractionStats,
}

/// Bookkeeping for an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    /// Which strategy produced the items.
    pub extractor_used: String,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u128,
    /// Files seen in the input, including skipped ones.
    pub files_seen: usize,
    /// Files dropped by the file filter.
    pub files_skipped: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn source_type_round_trips_through_str() {
        for ty in [
            SourceType::Git,
            SourceType::RedditWiki,
            SourceType::Hn5000,
            SourceType::Opml,
            SourceType::Bookmarks,
            SourceType::Obsidian,
            SourceType::Html,
            SourceType::Rss,
        ] {
            assert_eq!(ty.as_str().parse::<SourceType>().ok(), Some(ty));
        }
        assert!("svn".parse::<SourceType>().is_err());
    }

    #[test]
    fn implemented_set_is_fixed() {
        assert!(SourceType::Git.is_implemented());
        assert!(SourceType::RedditWiki.is_implemented());
        assert!(SourceType::Html.is_implemented());
        assert!(SourceType::Rss.is_implemented());
        assert!(SourceType::Hn5000.is_implemented());
        assert!(!SourceType::Opml.is_implemented());
        assert!(!SourceType::Bookmarks.is_implemented());
        assert!(!SourceType::Obsidian.is_implemented());
    }

    #[test]
    fn source_serializes_type_key() {
        let source = Source {
            name: "awesome".into(),
            path: "/cache/awesome".into(),
            url: "https://github.com/x/awesome".into(),
            enabled: true,
            source_type: SourceType::Git,
            last_updated: None,
            size: None,
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"type\":\"git\""));
        assert!(!json.contains("last_updated"));
    }
}
