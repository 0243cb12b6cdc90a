//! Arbitrary-HTML fetcher: snapshot a page as markdown.

use std::fs;
use std::path::Path;

use tracing::info;

use super::Fetcher;
use crate::Result;
use crate::types::Source;

pub(super) async fn add(client: &Fetcher, dir: &Path, source: &Source) -> Result<()> {
    let body = client.get_text(&source.url).await?;
    let markdown = html2md::parse_html(&body);

    fs::create_dir_all(dir)?;
    fs::write(dir.join("content.md"), &markdown)?;
    info!(name = %source.name, bytes = markdown.len(), "wrote content.md");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn conversion_keeps_links() {
        let html = r#"<h2>Tools</h2><ul><li><a href="https://example.com">Example</a> does things</li></ul>"#;
        let md = html2md::parse_html(html);
        assert!(md.contains("Tools"));
        assert!(md.contains("https://example.com"));
        assert!(md.contains("Example"));
    }
}
