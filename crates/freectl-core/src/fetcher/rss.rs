//! RSS/Atom feed fetcher: render a feed to a markdown digest.
//!
//! The digest keeps one `##` section per entry with its description, link and
//! publish date, plus a "Links from this item" subsection listing every href
//! found in the entry's HTML body so the extractor can pick them up.

use std::fs;
use std::path::Path;

use feed_rs::model::Feed;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::Fetcher;
use crate::types::Source;
use crate::{Error, Result};

static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"href=["']([^"']+)["']"#).unwrap()
});

pub(super) async fn add(client: &Fetcher, dir: &Path, source: &Source) -> Result<()> {
    let bytes = client.get_bytes(&source.url).await?;
    let feed = feed_rs::parser::parse(&bytes[..])
        .map_err(|e| Error::Parse(format!("failed to parse feed '{}': {e}", source.url)))?;
    let markdown = render_feed(&feed);

    fs::create_dir_all(dir)?;
    fs::write(dir.join("feed.md"), &markdown)?;
    info!(name = %source.name, entries = feed.entries.len(), "wrote feed.md");
    Ok(())
}

/// Render a parsed feed as the markdown digest described above.
pub(crate) fn render_feed(feed: &Feed) -> String {
    let mut out = String::new();

    let title = feed
        .title
        .as_ref()
        .map_or("Untitled feed", |t| t.content.as_str());
    out.push_str(&format!("# {title}\n\n"));

    if let Some(description) = &feed.description {
        out.push_str(&description.content);
        out.push_str("\n\n");
    }

    for entry in &feed.entries {
        let entry_title = entry
            .title
            .as_ref()
            .map_or("Untitled item", |t| t.content.as_str());
        out.push_str(&format!("## {entry_title}\n\n"));

        if let Some(summary) = &entry.summary {
            out.push_str(&summary.content);
            out.push_str("\n\n");
        }

        if let Some(link) = entry.links.first() {
            out.push_str(&format!("- Link: {}\n", link.href));
        }
        if let Some(published) = entry.published.or(entry.updated) {
            out.push_str(&format!("- Published: {}\n", published.to_rfc2822()));
        }
        out.push('\n');

        let mut hrefs: Vec<String> = Vec::new();
        if let Some(summary) = &entry.summary {
            hrefs.extend(collect_hrefs(&summary.content));
        }
        if let Some(body) = entry.content.as_ref().and_then(|c| c.body.as_ref()) {
            hrefs.extend(collect_hrefs(body));
        }
        hrefs.dedup();
        if !hrefs.is_empty() {
            out.push_str("### Links from this item\n\n");
            for href in hrefs {
                out.push_str(&format!("- {href}\n"));
            }
            out.push('\n');
        }
    }

    out
}

fn collect_hrefs(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Link Digest</title>
  <description>Weekly links</description>
  <item>
    <title>Issue 1</title>
    <description>&lt;p&gt;Check &lt;a href="https://example.com/a"&gt;this&lt;/a&gt; out&lt;/p&gt;</description>
    <link>https://digest.example/1</link>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn renders_feed_structure() {
        let feed = feed_rs::parser::parse(SAMPLE.as_bytes()).unwrap();
        let md = render_feed(&feed);
        assert!(md.starts_with("# Link Digest"));
        assert!(md.contains("## Issue 1"));
        assert!(md.contains("- Link: https://digest.example/1"));
        assert!(md.contains("- Published:"));
        assert!(md.contains("### Links from this item"));
        assert!(md.contains("- https://example.com/a"));
    }

    #[test]
    fn collect_hrefs_handles_both_quote_styles() {
        let hrefs = collect_hrefs(r#"<a href="https://a.com">a</a> <a href='https://b.com'>b</a>"#);
        assert_eq!(hrefs, vec!["https://a.com", "https://b.com"]);
    }
}
