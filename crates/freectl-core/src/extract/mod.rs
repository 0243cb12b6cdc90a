//! Link extraction from raw source content.
//!
//! An [`Extractor`] turns the raw bytes of a fetched source into a stream of
//! [`RawItem`]s. Raw content is either a single markdown document or a
//! concatenation of files joined by `<!-- FILE: path -->` markers; the
//! markers are produced by the engine when it walks a git tree and consumed
//! here to attribute items to files.

pub mod filter;
pub mod markdown;

pub use markdown::MarkdownExtractor;

use crate::text::{extract_domain, extract_url};
use crate::types::{ExtractionResult, SourceType};
use crate::Result;

/// Marker line prefix used to join multiple files into one buffer.
pub const FILE_MARKER_PREFIX: &str = "<!-- FILE: ";
/// Marker line suffix; see [`FILE_MARKER_PREFIX`].
pub const FILE_MARKER_SUFFIX: &str = " -->";

/// Build the separator line for a file path.
#[must_use]
pub fn file_marker(path: &str) -> String {
    format!("{FILE_MARKER_PREFIX}{path}{FILE_MARKER_SUFFIX}")
}

/// Context handed to an extractor alongside the raw bytes.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// Name of the source being processed.
    pub source_name: String,
    /// Kind of the source being processed.
    pub source_type: SourceType,
}

/// A pluggable content extractor.
///
/// The set of extractors is fixed at compile time and registered with the
/// engine in a `SourceType → extractor` map; `can_handle` and `priority`
/// exist so future extractors can compete for ambiguous content.
pub trait Extractor: Send + Sync {
    /// Stable identifier recorded in item metadata.
    fn name(&self) -> &'static str;
    /// Lower runs first when several extractors can handle the same bytes.
    fn priority(&self) -> u8;
    /// Cheap gate: can this extractor do anything useful with the content?
    fn can_handle(&self, content: &[u8]) -> bool;
    /// Run the extraction.
    fn extract(&self, content: &[u8], ctx: &ExtractionContext) -> Result<ExtractionResult>;
}

/// One file's worth of content inside a joined buffer.
#[derive(Debug, Clone)]
pub struct FileBlock {
    /// Path from the file marker; `None` for content before the first marker.
    pub path: Option<String>,
    /// The file's text.
    pub text: String,
    /// 1-based line number of the block's first line in the joined buffer.
    pub start_line: usize,
}

/// Split a joined buffer on `<!-- FILE: path -->` marker lines.
///
/// Content before the first marker becomes a pathless block. Blocks that are
/// entirely empty are dropped.
#[must_use]
pub fn split_file_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut current_path: Option<String> = None;
    let mut current_text = String::new();
    let mut current_start = 1usize;

    let flush = |path: Option<String>, text: &mut String, start: usize, out: &mut Vec<FileBlock>| {
        if !text.trim().is_empty() {
            out.push(FileBlock {
                path,
                text: std::mem::take(text),
                start_line: start,
            });
        } else {
            text.clear();
        }
    };

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(inner) = trimmed
            .strip_prefix(FILE_MARKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(FILE_MARKER_SUFFIX))
        {
            flush(current_path.take(), &mut current_text, current_start, &mut blocks);
            current_path = Some(inner.trim().to_string());
            current_start = idx + 2;
        } else {
            if current_text.is_empty() {
                current_start = idx + 1;
            }
            current_text.push_str(line);
            current_text.push('\n');
        }
    }
    flush(current_path, &mut current_text, current_start, &mut blocks);

    blocks
}

/// The shared URL gate: anchors, loopback hosts, `.localhost` domains and the
/// obvious private IPv4 ranges never become items. Anything the URL
/// recognizer would not pick up off a line is rejected as well.
#[must_use]
pub fn passes_url_gate(url: &str) -> bool {
    let url = url.trim();
    if url.starts_with('#') {
        return false;
    }
    let has_prefix =
        url.starts_with("http://") || url.starts_with("https://") || url.starts_with("www.");
    if !has_prefix || extract_url(url).is_empty() {
        return false;
    }
    !is_local_host(url)
}

fn is_local_host(url: &str) -> bool {
    let domain = extract_domain(url);
    let host = domain.split(':').next().unwrap_or(domain);
    host == "localhost"
        || host == "127.0.0.1"
        || host == "::1"
        || host == "[::1]"
        || host.ends_with(".localhost")
        || host.starts_with("192.168.")
        || host.starts_with("10.")
        || host.starts_with("172.")
}
