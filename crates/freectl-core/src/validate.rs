//! Item validation and cleaning.
//!
//! `validate` rejects raw items that could never become useful records;
//! `clean` normalizes the survivors into [`ProcessedItem`]s: stable content
//! ids, canonical URLs, bounded display fields, resolved categories, tags
//! and a confidence score.

use std::collections::HashMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::text::{clean_category, collapse_whitespace, replace_markdown_links};
use crate::types::{ItemMetadata, ProcessedItem, RawItem};
use crate::{Error, Result};

static STRICT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^https?://[^\s/$.?#].\S*$").unwrap()
});

/// Display ceiling for item names.
const MAX_NAME_CHARS: usize = 200;
/// Validation ceiling for raw names, before truncation.
const MAX_RAW_NAME_CHARS: usize = 500;
/// Hard cap on tags per item.
const MAX_TAGS: usize = 10;

/// Keyword → category table used when headings give nothing to work with.
/// First match wins, so order is significance order.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Development",
        &["github", "programming", "developer", "framework", "library", "sdk", "code", "api"],
    ),
    (
        "Media",
        &["video", "music", "movie", "stream", "audio", "photo", "podcast"],
    ),
    (
        "Education",
        &["learn", "course", "tutorial", "university", "book", "education"],
    ),
    ("News", &["news", "journal", "magazine", "blog"]),
    (
        "Security",
        &["security", "privacy", "vpn", "encrypt", "password"],
    ),
    ("Gaming", &["game", "gaming", "emulator"]),
    (
        "Social",
        &["social", "forum", "chat", "community", "messaging"],
    ),
];

/// Tag keywords matched against an item's text.
const TAG_KEYWORDS: &[&str] = &[
    "free",
    "opensource",
    "open-source",
    "selfhosted",
    "self-hosted",
    "privacy",
    "linux",
    "windows",
    "macos",
    "android",
    "ios",
    "api",
    "cli",
    "gui",
    "web",
];

/// Validates and cleans raw items into processed records.
pub struct ItemValidator {
    max_description_length: usize,
    auto_categorize: bool,
}

impl ItemValidator {
    /// Create a validator with the given description bound and
    /// auto-categorization behavior.
    #[must_use]
    pub const fn new(max_description_length: usize, auto_categorize: bool) -> Self {
        Self {
            max_description_length,
            auto_categorize,
        }
    }

    /// Reject items that could never become useful records.
    ///
    /// Checks: URL present, strictly `http(s)` with a host, name present and
    /// within the raw bound, description within twice the configured display
    /// bound (cleaning shrinks it further).
    pub fn validate(&self, raw: &RawItem) -> Result<()> {
        if raw.url.trim().is_empty() {
            return Err(Error::Validation("item has no URL".into()));
        }
        if !STRICT_URL_RE.is_match(raw.url.trim()) {
            return Err(Error::InvalidUrl(format!(
                "'{}' is not a valid http(s) URL",
                raw.url
            )));
        }
        let parsed = Url::parse(raw.url.trim())
            .map_err(|e| Error::InvalidUrl(format!("'{}': {e}", raw.url)))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidUrl(format!("'{}' has no host", raw.url)));
        }
        if raw.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "item for '{}' has no name",
                raw.url
            )));
        }
        if raw.name.chars().count() > MAX_RAW_NAME_CHARS {
            return Err(Error::Validation(format!(
                "name for '{}' exceeds {MAX_RAW_NAME_CHARS} characters",
                raw.url
            )));
        }
        if raw.description.chars().count() > self.max_description_length * 2 {
            return Err(Error::Validation(format!(
                "description for '{}' exceeds {} characters",
                raw.url,
                self.max_description_length * 2
            )));
        }
        Ok(())
    }

    /// Normalize a validated item into its processed form.
    pub fn clean(&self, raw: &RawItem, extractor_used: &str) -> ProcessedItem {
        let id = item_id(&raw.url, &raw.name, &raw.description);
        let url = normalize_url(&raw.url);
        let name = clean_name(&raw.name);
        let description =
            truncate_on_word_boundary(&clean_description_text(&raw.description), self.max_description_length);
        let category = self.resolve_category(raw);
        let subcategory = subcategory_of(&raw.heading_context);
        let tags = derive_tags(raw, &url);
        let confidence = confidence_of(raw, &name, &description, &url);

        ProcessedItem {
            id,
            url,
            name,
            description,
            category,
            subcategory,
            tags,
            source_context: non_empty(raw.context.trim()),
            raw_text: non_empty(raw.raw_text.trim()),
            extracted_at: Utc::now(),
            metadata: ItemMetadata {
                file_path: raw.metadata.get("file_path").cloned(),
                line_number: raw
                    .metadata
                    .get("line_number")
                    .and_then(|n| n.parse().ok()),
                heading_hierarchy: if raw.heading_context.is_empty() {
                    None
                } else {
                    Some(raw.heading_context.clone())
                },
                extractor_used: extractor_used.to_string(),
                confidence: Some(confidence),
                source_section: raw.heading_context.last().cloned(),
            },
        }
    }

    fn resolve_category(&self, raw: &RawItem) -> String {
        if let Some(hint) = raw.metadata.get("category") {
            let hint = hint.trim();
            if !hint.is_empty() && hint != "Uncategorized" {
                return normalize_category(hint);
            }
        }
        if let Some(deepest) = raw.heading_context.last() {
            let cleaned = clean_category(deepest);
            if cleaned != "n/a" {
                return normalize_category(&cleaned);
            }
        }
        if self.auto_categorize {
            if let Some(inferred) = infer_category(raw) {
                return inferred.to_string();
            }
        }
        "Uncategorized".to_string()
    }
}

/// First 16 hex characters of `MD5(url|name|description)`.
#[must_use]
pub fn item_id(url: &str, name: &str, description: &str) -> String {
    let digest = md5::compute(format!("{url}|{name}|{description}"));
    format!("{digest:x}")[..16].to_string()
}

/// Canonicalize a URL: parse, drop the fragment, drop a trailing slash.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url.trim()) else {
        return url.trim().to_string();
    };
    parsed.set_fragment(None);
    let mut s = parsed.to_string();
    if s.ends_with('/') {
        s.pop();
    }
    s
}

/// Normalize a category label: trim, drop a trailing plural `s`, capitalize
/// the first letter. The canonical inferred names are kept verbatim so
/// `News` does not decay into `New`.
#[must_use]
pub fn normalize_category(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return "Uncategorized".to_string();
    }
    for (canonical, _) in CATEGORY_KEYWORDS {
        if trimmed.eq_ignore_ascii_case(canonical) {
            return (*canonical).to_string();
        }
    }

    let depluralized = if trimmed.len() > 1 && trimmed.ends_with('s') && !trimmed.ends_with("ss") {
        &trimmed[..trimmed.len() - 1]
    } else {
        trimmed
    };

    let mut chars = depluralized.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Uncategorized".to_string(),
    }
}

fn infer_category(raw: &RawItem) -> Option<&'static str> {
    let haystack = format!("{} {} {}", raw.name, raw.description, raw.url).to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return Some(category);
        }
    }
    None
}

fn subcategory_of(heading_context: &[String]) -> Option<String> {
    if heading_context.len() >= 2 {
        heading_context
            .get(heading_context.len() - 2)
            .cloned()
            .filter(|s| !s.is_empty())
    } else {
        None
    }
}

fn clean_name(name: &str) -> String {
    let trimmed = name.trim().trim_matches(['*', '_', '`']);
    let without_controls: String = trimmed.chars().filter(|c| !c.is_control()).collect();
    let collapsed = collapse_whitespace(&without_controls);
    truncate_on_word_boundary(&collapsed, MAX_NAME_CHARS)
}

/// Strip markdown formatting from a description: headings, emphasis,
/// backticks, `[t](u)` links down to their text, and leading list markers.
fn clean_description_text(description: &str) -> String {
    // Replace links with their text until a fixed point, so link texts that
    // themselves contain links also flatten. Each pass removes characters,
    // so this terminates.
    let mut text = description.to_string();
    loop {
        let replaced = replace_markdown_links(&text);
        if replaced == text {
            break;
        }
        text = replaced;
    }

    let flattened: String = text
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.trim_start_matches('#').trim_start();
            line.trim_start_matches(['-', '*', '+']).trim_start()
        })
        .collect::<Vec<_>>()
        .join(" ");

    let without_marks: String = flattened
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect();
    collapse_whitespace(&without_marks)
}

/// Truncate at a word boundary to at most `max_chars` characters, appending
/// `…` when anything was dropped.
#[must_use]
pub fn truncate_on_word_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let hard_cut: String = s.chars().take(max_chars).collect();
    let cut = hard_cut
        .rfind(' ')
        .map_or(hard_cut.clone(), |idx| hard_cut[..idx].to_string());
    format!("{}…", cut.trim_end())
}

fn derive_tags(raw: &RawItem, url: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tag.is_empty() && !tags.contains(&tag) && tags.len() < MAX_TAGS {
            tags.push(tag);
        }
    };

    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            push(host.trim_start_matches("www.").to_lowercase());
        }
    }

    if let Some(path) = raw.metadata.get("file_path") {
        let lowered = path.to_lowercase();
        if lowered.contains("readme") {
            push("readme".to_string());
        }
        if lowered.contains("awesome") {
            push("awesome-list".to_string());
        }
    }

    let haystack = format!("{} {}", raw.name, raw.description).to_lowercase();
    for keyword in TAG_KEYWORDS {
        if haystack.contains(keyword) {
            push((*keyword).to_string());
        }
    }

    tags
}

fn confidence_of(raw: &RawItem, name: &str, description: &str, url: &str) -> f64 {
    let mut confidence: f64 = 0.5;
    if name.chars().count() >= 3 && name != url {
        confidence += 0.15;
    }
    if description.chars().count() >= 20 && description != name {
        confidence += 0.15;
    }
    if !raw.heading_context.is_empty() {
        confidence += 0.1;
    }
    if Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.contains('.')))
        .unwrap_or(false)
    {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Deduplicate processed items by URL, keeping first occurrences.
#[must_use]
pub fn deduplicate_by_url(items: Vec<ProcessedItem>) -> Vec<ProcessedItem> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone(), ()).is_none())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn validator() -> ItemValidator {
        ItemValidator::new(500, true)
    }

    fn raw(url: &str, name: &str, description: &str) -> RawItem {
        RawItem {
            url: url.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            ..RawItem::default()
        }
    }

    #[test]
    fn validate_accepts_ordinary_items() {
        let item = raw("https://example.com/x", "Example", "A thing");
        assert!(validator().validate(&item).is_ok());
    }

    #[test]
    fn validate_rejects_bad_urls() {
        for url in ["", "ftp://example.com", "not a url", "https://", "www.example.com"] {
            let item = raw(url, "Name", "Desc");
            assert!(validator().validate(&item).is_err(), "should reject {url:?}");
        }
    }

    #[test]
    fn validate_rejects_oversized_fields() {
        let item = raw("https://example.com", &"n".repeat(501), "d");
        assert!(validator().validate(&item).is_err());

        let item = raw("https://example.com", "n", &"d".repeat(1001));
        assert!(validator().validate(&item).is_err());

        let item = raw("https://example.com", "", "d");
        assert!(validator().validate(&item).is_err());
    }

    #[test]
    fn item_id_is_stable_16_hex() {
        let a = item_id("https://x.com", "X", "desc");
        let b = item_id("https://x.com", "X", "desc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, item_id("https://x.com", "Y", "desc"));
    }

    #[test]
    fn normalize_url_drops_fragment_and_trailing_slash() {
        assert_eq!(normalize_url("https://x.com/a/#frag"), "https://x.com/a");
        assert_eq!(normalize_url("https://x.com/"), "https://x.com");
        assert_eq!(normalize_url("https://x.com/a?q=1"), "https://x.com/a?q=1");
    }

    #[test]
    fn clean_strips_markdown_from_names() {
        let v = validator();
        let item = raw("https://x.com", "*  Penguin  Tools* ", "d");
        assert_eq!(v.clean(&item, "simple").name, "Penguin Tools");
    }

    #[test]
    fn clean_truncates_names_on_word_boundaries() {
        let v = validator();
        let long_name = "word ".repeat(60);
        let cleaned = v.clean(&raw("https://x.com", &long_name, "d"), "structured");
        assert!(cleaned.name.chars().count() <= 201, "name plus ellipsis");
        assert!(cleaned.name.ends_with('…'));
        assert!(!cleaned.name.trim_end_matches('…').ends_with(' '));
    }

    #[test]
    fn clean_flattens_description_markdown() {
        let v = validator();
        let item = raw(
            "https://x.com",
            "Name",
            "## About\n- **bold** `code` and [a link](https://y.com) here",
        );
        let cleaned = v.clean(&item, "structured");
        assert_eq!(cleaned.description, "About bold code and a link here");
    }

    #[test]
    fn clean_bounds_description_length() {
        let v = ItemValidator::new(50, true);
        let item = raw("https://x.com", "Name", &"lorem ipsum dolor ".repeat(20));
        let cleaned = v.clean(&item, "structured");
        assert!(cleaned.description.chars().count() <= 51);
        assert!(cleaned.description.ends_with('…'));
    }

    #[test]
    fn category_prefers_metadata_hint() {
        let v = validator();
        let mut item = raw("https://x.com", "Name", "Desc");
        item.metadata.insert("category".into(), "Tools".into());
        item.heading_context = vec!["Other".into()];
        assert_eq!(v.clean(&item, "structured").category, "Tool");
    }

    #[test]
    fn category_falls_back_to_heading_then_inference() {
        let v = validator();

        let mut item = raw("https://x.com", "Name", "Desc");
        item.heading_context = vec!["Media Servers".into()];
        assert_eq!(v.clean(&item, "structured").category, "Media Server");

        let item = raw("https://x.com", "Video downloader", "Grab any video stream");
        assert_eq!(v.clean(&item, "structured").category, "Media");

        let item = raw("https://x.com", "zzz", "qqq");
        assert_eq!(v.clean(&item, "structured").category, "Uncategorized");
    }

    #[test]
    fn category_inference_can_be_disabled() {
        let v = ItemValidator::new(500, false);
        let item = raw("https://x.com", "Video downloader", "Grab any stream");
        assert_eq!(v.clean(&item, "structured").category, "Uncategorized");
    }

    #[test]
    fn canonical_categories_keep_their_plural() {
        assert_eq!(normalize_category("News"), "News");
        assert_eq!(normalize_category("news"), "News");
        assert_eq!(normalize_category("tools"), "Tool");
        assert_eq!(normalize_category("class"), "Class");
        assert_eq!(normalize_category(""), "Uncategorized");
    }

    #[test]
    fn subcategory_is_second_to_last_heading() {
        let v = validator();
        let mut item = raw("https://x.com", "Name", "Desc");
        item.heading_context = vec!["Top".into(), "Middle".into(), "Leaf".into()];
        let cleaned = v.clean(&item, "structured");
        assert_eq!(cleaned.subcategory.as_deref(), Some("Middle"));

        item.heading_context = vec!["Only".into()];
        assert_eq!(v.clean(&item, "structured").subcategory, None);
    }

    #[test]
    fn tags_include_host_and_keywords_capped() {
        let v = validator();
        let mut item = raw(
            "https://www.example.com/app",
            "Free selfhosted privacy tool",
            "Works on linux windows macos android ios with api cli gui web support",
        );
        item.metadata
            .insert("file_path".into(), "awesome-selfhosted/README.md".into());
        let cleaned = v.clean(&item, "structured");

        assert!(cleaned.tags.contains(&"example.com".to_string()));
        assert!(cleaned.tags.contains(&"readme".to_string()));
        assert!(cleaned.tags.contains(&"awesome-list".to_string()));
        assert!(cleaned.tags.len() <= 10);
        assert_eq!(
            cleaned.tags.iter().collect::<std::collections::HashSet<_>>().len(),
            cleaned.tags.len(),
            "tags must be unique"
        );
    }

    #[test]
    fn confidence_is_bounded_and_monotone() {
        let v = validator();

        let poor = raw("https://x.com", "ab", "c");
        let poor_conf = v.clean(&poor, "simple").metadata.confidence.unwrap();

        let mut rich = raw(
            "https://example.com/tool",
            "Well Named Tool",
            "A descriptive explanation of what this tool does",
        );
        rich.heading_context = vec!["Tools".into()];
        let rich_conf = v.clean(&rich, "structured").metadata.confidence.unwrap();

        assert!((0.0..=1.0).contains(&poor_conf));
        assert!((0.0..=1.0).contains(&rich_conf));
        assert!(rich_conf > poor_conf);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let v = validator();
        let a = v.clean(&raw("https://x.com/a", "First", "d"), "s");
        let b = v.clean(&raw("https://x.com/a", "Second", "d"), "s");
        let c = v.clean(&raw("https://x.com/c", "Third", "d"), "s");

        let deduped = deduplicate_by_url(vec![a, b, c]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "First");
    }
}
