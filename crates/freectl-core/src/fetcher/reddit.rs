//! Reddit wiki fetcher.
//!
//! Old-style Reddit serves wiki pages with the raw markdown embedded in a
//! `<textarea class="source">` element, which is far easier to extract than
//! the rendered HTML. Any `reddit.com` URL is rewritten to `old.reddit.com`
//! before fetching.

use std::fs;
use std::path::Path;

use tracing::info;

use super::Fetcher;
use crate::types::Source;
use crate::{Error, Result};

pub(super) async fn add(client: &Fetcher, dir: &Path, source: &Source) -> Result<()> {
    let url = rewrite_to_old_reddit(&source.url);
    let body = client.get_text(&url).await?;
    let markdown = extract_wiki_markdown(&body).ok_or_else(|| {
        Error::Parse(format!(
            "no wiki source found at '{url}'; is this a wiki page?"
        ))
    })?;

    fs::create_dir_all(dir)?;
    fs::write(dir.join("wiki.md"), &markdown)?;
    info!(name = %source.name, bytes = markdown.len(), "wrote wiki.md");
    Ok(())
}

/// Rewrite `reddit.com` / `www.reddit.com` hosts to `old.reddit.com`.
pub(crate) fn rewrite_to_old_reddit(url: &str) -> String {
    url.replace("://www.reddit.com", "://old.reddit.com")
        .replace("://reddit.com", "://old.reddit.com")
}

/// Extract the body of the first `<textarea class="source">` element,
/// decoding HTML entities back to plain markdown.
pub(crate) fn extract_wiki_markdown(html: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(rel) = html[search_from..].find("<textarea") {
        let tag_start = search_from + rel;
        let tag_end = tag_start + html[tag_start..].find('>')?;
        let tag = &html[tag_start..=tag_end];
        if tag.contains("class=\"source\"") || tag.contains("class='source'") {
            let body_start = tag_end + 1;
            let body_end = body_start + html[body_start..].find("</textarea>")?;
            let raw = &html[body_start..body_end];
            return Some(html_escape::decode_html_entities(raw).into_owned());
        }
        search_from = tag_end + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_both_host_forms() {
        assert_eq!(
            rewrite_to_old_reddit("https://www.reddit.com/r/foo/wiki/index"),
            "https://old.reddit.com/r/foo/wiki/index"
        );
        assert_eq!(
            rewrite_to_old_reddit("https://reddit.com/r/foo/wiki/index"),
            "https://old.reddit.com/r/foo/wiki/index"
        );
        assert_eq!(
            rewrite_to_old_reddit("https://old.reddit.com/r/foo/wiki/index"),
            "https://old.reddit.com/r/foo/wiki/index"
        );
    }

    #[test]
    fn extracts_first_source_textarea() {
        let html = r#"
            <textarea name="other">not this one</textarea>
            <textarea rows="20" class="source" readonly># Wiki
* [Link](https://example.com) &amp; more</textarea>
        "#;
        let md = extract_wiki_markdown(html).unwrap_or_default();
        assert!(md.starts_with("# Wiki"));
        assert!(md.contains("& more"), "entities should be decoded");
    }

    #[test]
    fn missing_textarea_is_none() {
        assert!(extract_wiki_markdown("<html><body>nope</body></html>").is_none());
    }
}
