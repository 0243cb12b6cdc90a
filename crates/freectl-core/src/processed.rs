//! Atomic per-source JSON artifact storage.
//!
//! One artifact per source lives at `<cache>/processed/<sanitized name>.json`.
//! Saves go through a temp file and a rename, with a best-effort `.backup`
//! copy of the previous artifact, so a reader never observes a torn file:
//! it gets either the previous artifact or the new one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::ProcessingStatus;
use crate::text::sanitize_name;
use crate::types::ProcessedSource;
use crate::{Error, Result};

const META_DIR: &str = ".meta";
const META_FILE: &str = "processing.json";
/// Backups older than this are dropped by [`ProcessedStorage::compact`].
const BACKUP_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Handle to the processed-artifact tree.
pub struct ProcessedStorage {
    dir: PathBuf,
}

/// Aggregate numbers about the artifact tree.
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    /// Number of artifacts on disk.
    pub artifact_count: usize,
    /// Total bytes across artifacts, backups and temp files.
    pub total_bytes: u64,
    /// Root of the artifact tree.
    pub directory: PathBuf,
}

/// What a compaction pass removed.
#[derive(Debug, Clone, Default)]
pub struct CompactReport {
    /// Stale `.backup` files removed.
    pub removed_backups: usize,
    /// Orphaned `.tmp` files removed.
    pub removed_tmp: usize,
}

/// Engine bookkeeping persisted alongside the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// When the engine last ran.
    pub last_run: DateTime<Utc>,
    /// Status of each source in the last run.
    pub statuses: Vec<ProcessingStatus>,
}

impl ProcessedStorage {
    /// Open (and create if needed) the processed tree under `cache_dir`.
    pub fn new(cache_dir: &Path) -> Result<Self> {
        let dir = cache_dir.join("processed");
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Storage(format!("failed to create processed dir: {e}")))?;
        Ok(Self { dir })
    }

    /// Root directory of the artifact tree.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for a source name.
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(name)))
    }

    /// Persist an artifact atomically.
    ///
    /// An existing artifact is first copied to `<target>.backup`; failure to
    /// back up is logged and ignored. The new content is written to
    /// `<target>.tmp` and renamed into place.
    pub fn save(&self, processed: &ProcessedSource) -> Result<PathBuf> {
        let target = self.artifact_path(&processed.source.name);

        if target.exists() {
            let backup = backup_path(&target);
            if let Err(e) = fs::copy(&target, &backup) {
                warn!(path = %target.display(), error = %e, "failed to write backup");
            }
        }

        let json = serde_json::to_string_pretty(processed)?;
        let tmp = tmp_path(&target);
        fs::write(&tmp, json)
            .map_err(|e| Error::Storage(format!("failed to write artifact: {e}")))?;
        fs::rename(&tmp, &target)
            .map_err(|e| Error::Storage(format!("failed to commit artifact: {e}")))?;

        debug!(name = %processed.source.name, items = processed.items.len(), "artifact saved");
        Ok(target)
    }

    /// Load the artifact for a source name.
    pub fn load(&self, name: &str) -> Result<ProcessedSource> {
        let path = self.artifact_path(name);
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "no processed data for source '{name}'"
            )));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load every artifact, skipping unreadable ones with a warning.
    pub fn load_all(&self) -> Result<Vec<ProcessedSource>> {
        let mut all = Vec::new();
        for name in self.list()? {
            match self.load(&name) {
                Ok(processed) => all.push(processed),
                Err(e) => warn!(name, error = %e, "skipping unreadable artifact"),
            }
        }
        Ok(all)
    }

    /// List source names with an artifact on disk.
    ///
    /// `.backup` and `.tmp` files and subdirectories are not artifacts.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(stem) = file_name.strip_suffix(".json") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the artifact (and any backup) for a source name.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.artifact_path(name);
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "no processed data for source '{name}'"
            )));
        }
        fs::remove_file(&path)?;
        let backup = backup_path(&path);
        if backup.exists() {
            let _ = fs::remove_file(&backup);
        }
        Ok(())
    }

    /// Whether an artifact exists for a source name.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.artifact_path(name).exists()
    }

    /// Aggregate size information about the tree.
    pub fn storage_info(&self) -> Result<StorageInfo> {
        let mut artifact_count = 0usize;
        let mut total_bytes = 0u64;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let metadata = entry.metadata()?;
            total_bytes += metadata.len();
            if entry.file_name().to_string_lossy().ends_with(".json") {
                artifact_count += 1;
            }
        }
        Ok(StorageInfo {
            artifact_count,
            total_bytes,
            directory: self.dir.clone(),
        })
    }

    /// Remove stale backups and orphaned temp files.
    pub fn compact(&self) -> Result<CompactReport> {
        let mut report = CompactReport::default();
        let now = SystemTime::now();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();

            if file_name.ends_with(".tmp") {
                fs::remove_file(entry.path())?;
                report.removed_tmp += 1;
            } else if file_name.ends_with(".backup") {
                let modified = entry.metadata()?.modified()?;
                let age = now.duration_since(modified).unwrap_or_default();
                if age > BACKUP_RETENTION {
                    fs::remove_file(entry.path())?;
                    report.removed_backups += 1;
                }
            }
        }
        Ok(report)
    }

    /// Persist engine metadata under `.meta/processing.json`.
    pub fn save_metadata(&self, metadata: &EngineMetadata) -> Result<()> {
        let meta_dir = self.dir.join(META_DIR);
        fs::create_dir_all(&meta_dir)?;
        let path = meta_dir.join(META_FILE);
        let json = serde_json::to_string_pretty(metadata)?;
        let tmp = tmp_path(&path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load engine metadata if present.
    pub fn load_metadata(&self) -> Result<Option<EngineMetadata>> {
        let path = self.dir.join(META_DIR).join(META_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_owned();
    os.push(".backup");
    PathBuf::from(os)
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ProcessedItem, ItemMetadata, SourceInfo, SourceType};
    use tempfile::TempDir;

    fn sample(name: &str, urls: &[&str]) -> ProcessedSource {
        ProcessedSource {
            source: SourceInfo {
                name: name.to_string(),
                url: "https://github.com/x/y".to_string(),
                source_type: SourceType::Git,
                last_updated: None,
                version: "0.2.0".to_string(),
                processed_at: Utc::now(),
                item_count: urls.len(),
                errors: vec![],
            },
            items: urls
                .iter()
                .map(|url| ProcessedItem {
                    id: crate::validate::item_id(url, "n", "d"),
                    url: (*url).to_string(),
                    name: "n".to_string(),
                    description: "d".to_string(),
                    category: "Uncategorized".to_string(),
                    subcategory: None,
                    tags: vec![],
                    source_context: None,
                    raw_text: None,
                    extracted_at: Utc::now(),
                    metadata: ItemMetadata {
                        extractor_used: "structured".to_string(),
                        ..ItemMetadata::default()
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        let original = sample("animals", &["https://koala.com", "https://tiger.com"]);
        storage.save(&original).unwrap();

        let loaded = storage.load("animals").unwrap();
        assert_eq!(loaded.source.name, original.source.name);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].url, "https://koala.com");
    }

    #[test]
    fn save_backs_up_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        storage.save(&sample("s", &["https://a.com"])).unwrap();
        storage.save(&sample("s", &["https://b.com"])).unwrap();

        let backup = backup_path(&storage.artifact_path("s"));
        assert!(backup.exists());
        let backup_content = fs::read_to_string(backup).unwrap();
        assert!(backup_content.contains("https://a.com"));
        assert_eq!(storage.load("s").unwrap().items[0].url, "https://b.com");
    }

    #[test]
    fn list_skips_backups_tmp_and_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        storage.save(&sample("alpha", &[])).unwrap();
        storage.save(&sample("beta", &[])).unwrap();
        fs::write(storage.dir().join("alpha.json.backup"), "{}").unwrap();
        fs::write(storage.dir().join("x.json.tmp"), "{}").unwrap();
        fs::create_dir_all(storage.dir().join("nested.json")).unwrap();

        assert_eq!(storage.list().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn delete_removes_artifact_and_backup() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        storage.save(&sample("s", &["https://a.com"])).unwrap();
        storage.save(&sample("s", &["https://b.com"])).unwrap();
        storage.delete("s").unwrap();

        assert!(!storage.exists("s"));
        assert!(!backup_path(&storage.artifact_path("s")).exists());
        assert!(matches!(storage.load("s"), Err(Error::NotFound(_))));
    }

    #[test]
    fn compact_drops_tmp_and_old_backups() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        fs::write(storage.dir().join("a.json.tmp"), "{}").unwrap();
        fs::write(storage.dir().join("fresh.json.backup"), "{}").unwrap();

        let report = storage.compact().unwrap();
        assert_eq!(report.removed_tmp, 1);
        // The fresh backup is younger than the retention window.
        assert_eq!(report.removed_backups, 0);
        assert!(storage.dir().join("fresh.json.backup").exists());
        assert!(!storage.dir().join("a.json.tmp").exists());
    }

    #[test]
    fn artifact_names_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();
        assert!(
            storage
                .artifact_path("my/list")
                .ends_with("processed/my_list.json")
        );
    }

    #[test]
    fn metadata_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = ProcessedStorage::new(dir.path()).unwrap();

        assert!(storage.load_metadata().unwrap().is_none());
        storage
            .save_metadata(&EngineMetadata {
                last_run: Utc::now(),
                statuses: vec![],
            })
            .unwrap();
        assert!(storage.load_metadata().unwrap().is_some());
    }
}
