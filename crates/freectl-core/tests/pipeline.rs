//! End-to-end pipeline tests: fetch layout → engine → storage → search.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use freectl_core::engine::ProcessingEngine;
use freectl_core::processed::ProcessedStorage;
use freectl_core::search::{SearchQuery, search_online, search_processed};
use freectl_core::settings::Settings;
use freectl_core::types::{Source, SourceType};
use tempfile::TempDir;

fn settings_with(cache: &Path, name: &str) -> Settings {
    let mut settings = Settings::default();
    settings.cache_dir = cache.to_path_buf();
    settings.sources.push(Source {
        name: name.to_string(),
        path: cache.join(name).to_string_lossy().into_owned(),
        url: "https://example.com/corpus".to_string(),
        enabled: true,
        source_type: SourceType::Git,
        last_updated: None,
        size: None,
    });
    settings
}

fn write_file(cache: &Path, source: &str, file: &str, content: &str) {
    let dir = cache.join(source);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

#[tokio::test]
async fn structured_extraction_and_search() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "animals");
    write_file(
        dir.path(),
        "animals",
        "list.md",
        "### Koala\n* [Koala](https://koala.com/)\n#### Kangaroo\n* [Kangaroo](https://kangaroo.com/)\n",
    );

    // Online search over the raw tree.
    let results = search_online(&settings, &SearchQuery::new("koala")).unwrap();
    assert_eq!(results[0].url, "https://koala.com/");
    assert_eq!(results[0].category, "Koala");
    assert_eq!(results[0].score, 100);

    // Preprocessed search over the artifact.
    let engine = ProcessingEngine::new(settings.clone());
    engine
        .process_source(settings.find_source("animals").unwrap())
        .await
        .unwrap();
    let results = search_processed(&settings, &SearchQuery::new("koala")).unwrap();
    assert_eq!(results[0].url, "https://koala.com");
    assert_eq!(results[0].category, "Koala");
    assert_eq!(results[0].score, 100);
}

#[tokio::test]
async fn heading_inference_under_nested_levels() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "birds");
    write_file(
        dir.path(),
        "birds",
        "list.md",
        "## [Ostrich](https://ostrich.com/)\n### [Tiger](https://tiger.com/)\n* [Eagle](https://eagle.com/)\n",
    );

    let results = search_online(&settings, &SearchQuery::new("eagle")).unwrap();
    assert_eq!(results[0].url, "https://eagle.com/");
    assert_eq!(results[0].category, "Tiger");
}

#[tokio::test]
async fn plain_url_fallback_through_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "penguins");
    write_file(
        dir.path(),
        "penguins",
        "list.md",
        "## Penguin\n* Penguin https://penguin.com/\n",
    );

    let engine = ProcessingEngine::new(settings.clone());
    engine
        .process_source(settings.find_source("penguins").unwrap())
        .await
        .unwrap();

    let results = search_processed(&settings, &SearchQuery::new("penguin")).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].url, "https://penguin.com");
    assert_eq!(results[0].category, "Penguin");
    assert_eq!(results[0].name, "Penguin");
}

#[tokio::test]
async fn misleading_headings_never_become_categories() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "lists");
    write_file(
        dir.path(),
        "lists",
        "list.md",
        "## Contents\n* [Foo Tool](https://foo.com/)\n",
    );

    let engine = ProcessingEngine::new(settings.clone());
    engine
        .process_source(settings.find_source("lists").unwrap())
        .await
        .unwrap();

    let storage = ProcessedStorage::new(dir.path()).unwrap();
    let processed = storage.load("lists").unwrap();
    assert_eq!(processed.items.len(), 1);
    assert_ne!(processed.items[0].category, "Contents");
}

#[tokio::test]
async fn sparse_readme_is_gated_out() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "gated");
    write_file(
        dir.path(),
        "gated",
        "README.md",
        "intro\nhttps://a.com\nmore text\nhttps://b.com\nend\n",
    );

    let engine = ProcessingEngine::new(settings.clone());
    engine
        .process_source(settings.find_source("gated").unwrap())
        .await
        .unwrap();

    let storage = ProcessedStorage::new(dir.path()).unwrap();
    assert!(storage.load("gated").unwrap().items.is_empty());
}

#[tokio::test]
async fn processed_artifacts_have_unique_urls_and_bounded_fields() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with(dir.path(), "bounded");
    let mut content = String::from("## Tools\n");
    for i in 0..20 {
        content.push_str(&format!(
            "* [Tool number {i} with quite a long display name for testing purposes](https://tool.com/{})\n",
            i % 7
        ));
    }
    write_file(dir.path(), "bounded", "list.md", &content);

    let engine = ProcessingEngine::new(settings.clone());
    engine
        .process_source(settings.find_source("bounded").unwrap())
        .await
        .unwrap();

    let storage = ProcessedStorage::new(dir.path()).unwrap();
    let processed = storage.load("bounded").unwrap();

    let mut urls: Vec<&str> = processed.items.iter().map(|i| i.url.as_str()).collect();
    let total = urls.len();
    urls.sort_unstable();
    urls.dedup();
    assert_eq!(urls.len(), total, "urls must be pairwise distinct");
    assert_eq!(total, 7);

    for item in &processed.items {
        assert!(item.name.chars().count() <= 201);
        assert!(item.description.chars().count() <= settings.max_description_length + 1);
        let confidence = item.metadata.confidence.unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(item.id.len(), 16);
    }
}

#[test]
fn concurrent_save_and_load_never_tear() {
    let dir = TempDir::new().unwrap();
    let storage = ProcessedStorage::new(dir.path()).unwrap();

    let make = |url: &str| freectl_core::types::ProcessedSource {
        source: freectl_core::types::SourceInfo {
            name: "race".to_string(),
            url: String::new(),
            source_type: SourceType::Git,
            last_updated: None,
            version: "0.2.0".to_string(),
            processed_at: chrono::Utc::now(),
            item_count: 1,
            errors: vec![],
        },
        items: vec![freectl_core::types::ProcessedItem {
            id: "0123456789abcdef".to_string(),
            url: url.to_string(),
            name: "n".to_string(),
            description: "d".repeat(2000),
            category: "Uncategorized".to_string(),
            subcategory: None,
            tags: vec![],
            source_context: None,
            raw_text: None,
            extracted_at: chrono::Utc::now(),
            metadata: freectl_core::types::ItemMetadata {
                extractor_used: "structured".to_string(),
                ..Default::default()
            },
        }],
    };

    storage.save(&make("https://old.com")).unwrap();

    std::thread::scope(|scope| {
        let writer_storage = ProcessedStorage::new(dir.path()).unwrap();
        scope.spawn(move || {
            for i in 0..50 {
                writer_storage.save(&make(&format!("https://new.com/{i}"))).unwrap();
            }
        });

        let reader_storage = ProcessedStorage::new(dir.path()).unwrap();
        scope.spawn(move || {
            for _ in 0..50 {
                // Every observed state parses and is a complete artifact.
                let loaded = reader_storage.load("race").unwrap();
                assert_eq!(loaded.items.len(), 1);
                let url = &loaded.items[0].url;
                assert!(url == "https://old.com" || url.starts_with("https://new.com/"));
            }
        });
    });
}
