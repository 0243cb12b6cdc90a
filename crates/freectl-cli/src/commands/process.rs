//! `freectl process` - run the preprocessing engine over fetched sources.

use std::time::Instant;

use anyhow::Result;
use freectl_core::engine::{ProcessingEngine, ProcessingState};
use freectl_core::{Settings, Source};
use tracing::info;

pub async fn run(only: Option<&str>, force: bool, sequential: bool) -> Result<()> {
    let started = Instant::now();
    let mut settings = Settings::load()?;
    if sequential {
        settings.parallel_processing = false;
    }

    let targets: Vec<Source> = settings
        .sources
        .iter()
        .filter(|s| only.map_or(s.enabled, |name| name == s.name))
        .cloned()
        .collect();
    if targets.is_empty() {
        if let Some(name) = only {
            anyhow::bail!("no source named '{name}'");
        }
        println!("No sources to process.");
        return Ok(());
    }

    let engine = ProcessingEngine::new(settings);

    let pending: Vec<Source> = if force {
        targets
    } else {
        let mut pending = Vec::new();
        for source in targets {
            if engine.needs_processing(&source)? {
                pending.push(source);
            } else {
                info!(name = %source.name, "artifact up to date, skipping");
            }
        }
        pending
    };

    if pending.is_empty() {
        println!("All artifacts up to date. Use --force to reprocess.");
        return Ok(());
    }

    let outcome = engine.process_all_sources(&pending).await;

    let statuses = engine.processing_status();
    let processed = statuses
        .iter()
        .filter(|s| {
            matches!(
                s.status,
                ProcessingState::Completed | ProcessingState::CompletedWithErrors
            )
        })
        .count();
    let failed = statuses
        .iter()
        .filter(|s| s.status == ProcessingState::Error)
        .count();
    println!(
        "processed={processed} failed={failed} duration={}ms",
        started.elapsed().as_millis()
    );

    for status in &statuses {
        if let Some(error) = &status.error {
            eprintln!("  {}: {error}", status.source_name);
        }
    }

    outcome?;
    Ok(())
}
