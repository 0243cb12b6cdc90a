//! Per-type source fetchers.
//!
//! Each supported [`SourceType`] knows how to acquire raw content into the
//! source's cache directory in a layout its extractor can consume:
//!
//! - `git`: the repository tree itself (shallow clone, fast-forward pulls)
//! - `reddit_wiki`: `wiki.md`
//! - `html`: `content.md`
//! - `rss`: `feed.md`
//! - `hn5000`: `hn5000.md`
//!
//! Fetchers are idempotent; for every type except `git`, update is the same
//! operation as add.

mod git;
mod hn;
mod html;
mod reddit;
mod rss;

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::types::{Source, SourceType};
use crate::{Error, Result};

/// SHA-256 of fetched content, hex-encoded. Logged on every fetch so content
/// changes are visible across runs.
fn calculate_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// HTTP client shared by the network-backed fetchers.
///
/// Every request carries a finite timeout and a non-empty user agent; some
/// endpoints (Reddit in particular) refuse anonymous clients.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with the default 30 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a fetcher with a custom request timeout (primarily for tests).
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("freectl/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Fetch a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("resource not found at '{url}'")));
        }
        if !status.is_success() {
            match response.error_for_status() {
                Ok(_) => unreachable!("status should be an error"),
                Err(err) => return Err(Error::Network(err)),
            }
        }

        let body = response.text().await?;
        info!(
            url,
            bytes = body.len(),
            sha256 = %calculate_sha256(body.as_bytes()),
            "fetched"
        );
        Ok(body)
    }

    /// Fetch a URL and return the raw bytes.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("resource not found at '{url}'")));
        }
        if !status.is_success() {
            match response.error_for_status() {
                Ok(_) => unreachable!("status should be an error"),
                Err(err) => return Err(Error::Network(err)),
            }
        }

        let body = response.bytes().await?.to_vec();
        info!(
            url,
            bytes = body.len(),
            sha256 = %calculate_sha256(&body),
            "fetched"
        );
        Ok(body)
    }
}

/// Dispatches add/update operations to the fetcher for a source's type.
pub struct SourceFetcher {
    client: Fetcher,
}

impl SourceFetcher {
    /// Creates the dispatcher with a fresh HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Fetcher::new()?,
        })
    }

    /// Acquire the source's content into `dir`.
    ///
    /// Git operations are blocking network+disk work, so they run on the
    /// blocking thread pool rather than occupying a runtime worker.
    pub async fn add(&self, dir: &Path, source: &Source) -> Result<()> {
        match source.source_type {
            SourceType::Git => {
                let dir = dir.to_path_buf();
                let source = source.clone();
                tokio::task::spawn_blocking(move || git::add(&dir, &source))
                    .await
                    .map_err(|e| Error::Git(format!("clone task failed: {e}")))?
            },
            SourceType::RedditWiki => reddit::add(&self.client, dir, source).await,
            SourceType::Html => html::add(&self.client, dir, source).await,
            SourceType::Rss => rss::add(&self.client, dir, source).await,
            SourceType::Hn5000 => hn::add(&self.client, dir, source).await,
            other => Err(Error::Validation(format!(
                "source type '{other}' has no fetcher"
            ))),
        }
    }

    /// Refresh the source's content in `dir`.
    ///
    /// A failed git pull is logged and ignored so a temporarily unreachable
    /// remote never blocks a batch update; every other type re-runs its add.
    pub async fn update(&self, dir: &Path, source: &Source) -> Result<()> {
        match source.source_type {
            SourceType::Git => {
                let task_dir = dir.to_path_buf();
                let task_source = source.clone();
                let pulled = tokio::task::spawn_blocking(move || {
                    git::update(&task_dir, &task_source)
                })
                .await
                .map_err(|e| Error::Git(format!("pull task failed: {e}")))
                .and_then(|result| result);
                if let Err(e) = pulled {
                    warn!(name = %source.name, error = %e, "git pull failed, keeping cached tree");
                }
                Ok(())
            },
            _ => self.add(dir, source).await,
        }
    }
}
