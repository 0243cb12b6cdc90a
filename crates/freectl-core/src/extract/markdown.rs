//! Multi-strategy markdown link extraction.
//!
//! Three strategies run in priority order and the first one that produces
//! items wins:
//!
//! 1. **Structured** — a tree-sitter AST walk that tracks the active heading
//!    per level and attributes each `[text](url)` link to its enclosing
//!    paragraph and heading hierarchy. Needs at least one ATX heading and one
//!    markdown link to engage.
//! 2. **Regex** — a line-oriented pass that tracks `^#+ ` headings and pulls
//!    the first markdown link off each line.
//! 3. **Simple** — bare-URL recognition for content with no markdown links
//!    at all; also the fallback when everything else comes up empty.
//!
//! Best-effort by design: a strategy that finds *something* shadows the ones
//! below it even if another strategy might have found more.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use tree_sitter::{Node, Parser};

use super::filter;
use super::{ExtractionContext, Extractor, FileBlock, passes_url_gate, split_file_blocks};
use crate::text::{
    clean_category, clean_description, clean_markdown, collapse_whitespace, extract_domain,
    extract_markdown_link, extract_url, is_invalid_category, remove_urls,
};
use crate::types::{ExtractionResult, ExtractionStats, RawItem};
use crate::{Error, Result};

static ATX_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?m)^#{1,6}\s").unwrap()
});
static MARKDOWN_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap()
});
static HEADING_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(#{1,6})\s+(.*)$").unwrap()
});

/// Headings that structure a document without describing its content.
/// They must never become categories.
pub(crate) const MISLEADING_HEADINGS: &[&str] = &[
    "contents",
    "table of contents",
    "toc",
    "index",
    "contributing",
    "license",
    "changelog",
    "authors",
    "installation",
    "usage",
    "getting started",
];

/// Case-insensitive membership test against [`MISLEADING_HEADINGS`].
pub(crate) fn is_misleading_heading(s: &str) -> bool {
    let lowered = s.trim().to_lowercase();
    MISLEADING_HEADINGS.contains(&lowered.as_str())
}

/// Pick a category from a heading map: the deepest heading whose cleaned
/// text is usable. `below_level` restricts the search to strictly shallower
/// headings, which is how links sitting inside a heading avoid categorizing
/// themselves.
pub(crate) fn resolve_category(
    headings: &BTreeMap<usize, String>,
    below_level: Option<usize>,
) -> String {
    for (level, raw) in headings.iter().rev() {
        if let Some(max) = below_level {
            if *level >= max {
                continue;
            }
        }
        let cleaned = clean_category(raw);
        if cleaned == "n/a" || is_misleading_heading(&cleaned) || is_invalid_category(&cleaned) {
            continue;
        }
        return cleaned;
    }
    "Uncategorized".to_string()
}

/// The ordered ancestor headings, cleaned for display.
pub(crate) fn heading_context(headings: &BTreeMap<usize, String>) -> Vec<String> {
    headings
        .values()
        .map(|raw| {
            let cleaned = clean_category(raw);
            if cleaned == "n/a" {
                collapse_whitespace(raw)
            } else {
                cleaned
            }
        })
        .collect()
}

/// A link discovered during an AST walk.
pub(crate) struct LinkEvent<'a> {
    /// Link text, raw.
    pub text: String,
    /// Link destination, raw.
    pub url: String,
    /// Inline text of the enclosing paragraph; `None` for links inside
    /// headings.
    pub paragraph: Option<String>,
    /// Active headings by level at the time of discovery.
    pub headings: &'a BTreeMap<usize, String>,
    /// Set when the link sits inside a heading, to that heading's level.
    pub heading_level: Option<usize>,
    /// 1-based line within the walked text.
    pub line: usize,
}

/// Tree-sitter driven walker shared by the structured strategy and the
/// online search path.
///
/// Not thread-safe: tree-sitter parsers keep internal mutable state, so each
/// worker creates its own walker.
pub(crate) struct MarkdownWalker {
    block: Parser,
    inline: Parser,
}

impl MarkdownWalker {
    /// Create a walker with the markdown block and inline grammars loaded.
    pub fn new() -> Result<Self> {
        let mut block = Parser::new();
        block
            .set_language(&tree_sitter_md::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("failed to load markdown grammar: {e}")))?;
        let mut inline = Parser::new();
        inline
            .set_language(&tree_sitter_md::INLINE_LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("failed to load inline grammar: {e}")))?;
        Ok(Self { block, inline })
    }

    /// Walk `text` in document order, invoking `f` for every markdown link.
    pub fn walk(&mut self, text: &str, f: &mut dyn FnMut(&LinkEvent<'_>)) -> Result<()> {
        let tree = self
            .block
            .parse(text, None)
            .ok_or_else(|| Error::Parse("failed to parse markdown".into()))?;
        let mut headings: BTreeMap<usize, String> = BTreeMap::new();
        self.visit(tree.root_node(), text, &mut headings, f);
        Ok(())
    }

    fn visit(
        &mut self,
        node: Node<'_>,
        src: &str,
        headings: &mut BTreeMap<usize, String>,
        f: &mut dyn FnMut(&LinkEvent<'_>),
    ) {
        match node.kind() {
            "atx_heading" | "setext_heading" => {
                let raw = node.utf8_text(src.as_bytes()).unwrap_or_default();
                let level = heading_level(raw);
                let inline_text = inline_child_text(node, src);
                let heading_text = if inline_text.trim().is_empty() {
                    raw.trim_start_matches('#').trim().to_string()
                } else {
                    inline_text.trim().to_string()
                };

                let deeper: Vec<usize> = headings.range(level + 1..).map(|(l, _)| *l).collect();
                for l in deeper {
                    headings.remove(&l);
                }
                headings.insert(level, heading_text);

                let line = node.start_position().row + 1;
                for (text, url) in self.inline_links(&inline_text) {
                    f(&LinkEvent {
                        text,
                        url,
                        paragraph: None,
                        headings,
                        heading_level: Some(level),
                        line,
                    });
                }
            },
            "paragraph" | "pipe_table_cell" => {
                let inline_text = inline_child_text(node, src);
                let line = node.start_position().row + 1;
                for (text, url) in self.inline_links(&inline_text) {
                    f(&LinkEvent {
                        text,
                        url,
                        paragraph: Some(inline_text.clone()),
                        headings,
                        heading_level: None,
                        line,
                    });
                }
            },
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
                for child in children {
                    self.visit(child, src, headings, f);
                }
            },
        }
    }

    /// Parse an inline fragment and collect `(text, destination)` pairs for
    /// every `[..](..)` link in it.
    fn inline_links(&mut self, inline_text: &str) -> Vec<(String, String)> {
        if inline_text.is_empty() {
            return Vec::new();
        }
        let Some(tree) = self.inline.parse(inline_text, None) else {
            return Vec::new();
        };
        let mut links = Vec::new();
        collect_inline_links(tree.root_node(), inline_text, &mut links);
        links
    }
}

fn collect_inline_links(node: Node<'_>, src: &str, out: &mut Vec<(String, String)>) {
    if node.kind() == "inline_link" {
        let mut text = String::new();
        let mut url = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "link_text" => {
                    text = child.utf8_text(src.as_bytes()).unwrap_or_default().to_string();
                },
                "link_destination" => {
                    url = child.utf8_text(src.as_bytes()).unwrap_or_default().to_string();
                },
                _ => {},
            }
        }
        out.push((text, url));
        return;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children {
        collect_inline_links(child, src, out);
    }
}

fn heading_level(raw: &str) -> usize {
    let hashes = raw.trim_start().chars().take_while(|&c| c == '#').count();
    if hashes > 0 {
        return hashes.min(6);
    }
    // Setext headings: `===` underlines are level 1, `---` level 2.
    if raw.trim_end().ends_with('=') { 1 } else { 2 }
}

fn inline_child_text(node: Node<'_>, src: &str) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "inline" {
            return child.utf8_text(src.as_bytes()).unwrap_or_default().to_string();
        }
    }
    String::new()
}

/// One extraction algorithm inside the markdown extractor.
trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> u8;
    fn can_handle(&self, text: &str) -> bool;
    fn extract(&self, blocks: &[FileBlock]) -> Result<Vec<RawItem>>;
}

fn base_metadata(block: &FileBlock, line_in_block: usize, category: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("category".to_string(), category.to_string());
    if let Some(path) = &block.path {
        metadata.insert("file_path".to_string(), path.clone());
    }
    metadata.insert(
        "line_number".to_string(),
        (block.start_line - 1 + line_in_block).to_string(),
    );
    metadata
}

/// AST-based extraction with full heading-hierarchy tracking.
struct StructuredStrategy;

impl Strategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn can_handle(&self, text: &str) -> bool {
        ATX_HEADING_RE.is_match(text) && MARKDOWN_LINK_RE.is_match(text)
    }

    fn extract(&self, blocks: &[FileBlock]) -> Result<Vec<RawItem>> {
        let mut walker = MarkdownWalker::new()?;
        let mut items = Vec::new();

        for block in blocks {
            walker.walk(&block.text, &mut |event| {
                let url = event.url.trim().to_string();
                if !passes_url_gate(&url) {
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
                let category = resolve_category(event.headings, None);

                items.push(RawItem {
                    url,
                    name: name.to_string(),
                    description,
                    context: event.paragraph.clone().unwrap_or_default(),
                    raw_text: event.paragraph.clone().unwrap_or_else(|| event.text.clone()),
                    heading_context: heading_context(event.headings),
                    metadata: base_metadata(block, event.line, &category),
                });
            })?;
        }

        Ok(items)
    }
}

/// Line-oriented extraction keyed on `^#+ ` headings and markdown links.
struct RegexStrategy;

impl Strategy for RegexStrategy {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn can_handle(&self, text: &str) -> bool {
        MARKDOWN_LINK_RE.is_match(text)
    }

    fn extract(&self, blocks: &[FileBlock]) -> Result<Vec<RawItem>> {
        let mut items = Vec::new();

        for block in blocks {
            let mut current_heading: Option<String> = None;
            for (idx, line) in block.text.lines().enumerate() {
                if let Some(caps) = HEADING_LINE_RE.captures(line) {
                    current_heading = Some(caps[2].to_string());
                    continue;
                }

                let (text, url) = extract_markdown_link(line);
                if url.is_empty() || !passes_url_gate(&url) {
                    continue;
                }

                let name = if text.trim().is_empty() {
                    url.clone()
                } else {
                    text.trim().to_string()
                };
                let category = resolve_line_category(current_heading.as_deref());

                items.push(RawItem {
                    url,
                    name,
                    description: clean_description(&clean_markdown(line)),
                    context: line.to_string(),
                    raw_text: line.to_string(),
                    heading_context: current_heading
                        .as_deref()
                        .map(|h| vec![collapse_whitespace(h)])
                        .unwrap_or_default(),
                    metadata: base_metadata(block, idx + 1, &category),
                });
            }
        }

        Ok(items)
    }
}

/// Bare-URL extraction for content without markdown links.
struct SimpleStrategy;

impl Strategy for SimpleStrategy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn can_handle(&self, text: &str) -> bool {
        text.contains("http://") || text.contains("https://") || text.contains("www.")
    }

    fn extract(&self, blocks: &[FileBlock]) -> Result<Vec<RawItem>> {
        let mut items = Vec::new();

        for block in blocks {
            let mut current_heading: Option<String> = None;
            for (idx, line) in block.text.lines().enumerate() {
                if let Some(caps) = HEADING_LINE_RE.captures(line) {
                    current_heading = Some(caps[2].to_string());
                    continue;
                }

                let url = extract_url(line);
                if url.is_empty() || !passes_url_gate(url) {
                    continue;
                }
                let url = url.to_string();

                let mut name = clean_description(&remove_urls(line));
                if name.chars().count() < 4 {
                    name = extract_domain(&url).to_string();
                }
                let description = clean_description(&remove_urls(line));
                let category = resolve_line_category(current_heading.as_deref());

                items.push(RawItem {
                    url,
                    name,
                    description,
                    context: line.to_string(),
                    raw_text: line.to_string(),
                    heading_context: current_heading
                        .as_deref()
                        .map(|h| vec![collapse_whitespace(h)])
                        .unwrap_or_default(),
                    metadata: base_metadata(block, idx + 1, &category),
                });
            }
        }

        Ok(items)
    }
}

fn resolve_line_category(heading: Option<&str>) -> String {
    heading
        .map(clean_category)
        .filter(|c| c != "n/a" && !is_misleading_heading(c) && !is_invalid_category(c))
        .unwrap_or_else(|| "Uncategorized".to_string())
}

/// The markdown extractor: file filtering plus the strategy cascade.
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    /// Creates the extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for MarkdownExtractor {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn priority(&self) -> u8 {
        10
    }

    fn can_handle(&self, content: &[u8]) -> bool {
        !content.is_empty()
    }

    fn extract(&self, content: &[u8], ctx: &ExtractionContext) -> Result<ExtractionResult> {
        let started = Instant::now();
        let text = String::from_utf8_lossy(content).into_owned();

        let blocks = split_file_blocks(&text);
        let files_seen = blocks.len();
        let kept: Vec<FileBlock> = blocks
            .into_iter()
            .filter(|block| {
                block
                    .path
                    .as_deref()
                    .is_none_or(|path| !filter::should_skip(path, &block.text))
            })
            .collect();
        let files_skipped = files_seen - kept.len();

        let mut strategies: Vec<&dyn Strategy> =
            vec![&StructuredStrategy, &RegexStrategy, &SimpleStrategy];
        strategies.sort_by_key(|s| s.priority());
        let mut errors = Vec::new();

        for strategy in strategies {
            if !strategy.can_handle(&text) {
                continue;
            }
            match strategy.extract(&kept) {
                Ok(items) if !items.is_empty() => {
                    debug!(
                        source = %ctx.source_name,
                        strategy = strategy.name(),
                        items = items.len(),
                        "extraction complete"
                    );
                    return Ok(ExtractionResult {
                        items,
                        errors,
                        stats: ExtractionStats {
                            extractor_used: strategy.name().to_string(),
                            processing_time_ms: started.elapsed().as_millis(),
                            files_seen,
                            files_skipped,
                        },
                    });
                },
                Ok(_) => {},
                Err(e) => errors.push(format!("{} strategy failed: {e}", strategy.name())),
            }
        }

        // Nothing produced items; run the simple pass once more as a final
        // fallback so plain URL dumps still index.
        let items = SimpleStrategy.extract(&kept)?;
        Ok(ExtractionResult {
            items,
            errors,
            stats: ExtractionStats {
                extractor_used: "simple".to_string(),
                processing_time_ms: started.elapsed().as_millis(),
                files_seen,
                files_skipped,
            },
        })
    }
}
