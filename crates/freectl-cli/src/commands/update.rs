//! `freectl update` - refresh cached content for enabled sources.

use anyhow::Result;
use freectl_core::manager;

pub async fn run(name: Option<&str>) -> Result<()> {
    let summary = manager::update_sources(name).await?;
    println!(
        "updated={} failed={} duration={}ms",
        summary.updated, summary.failed, summary.duration_ms
    );
    if summary.failed > 0 {
        anyhow::bail!("{} source(s) failed to update", summary.failed);
    }
    Ok(())
}
