//! Git repository fetcher: shallow clone on add, fast-forward pull on update.

use std::fs;
use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, Repository};
use tracing::{debug, info};

use crate::types::Source;
use crate::{Error, Result};

/// Clone the repository into `dir` with depth 1. If a repository is already
/// present, falls through to a pull so add stays idempotent.
pub(super) fn add(dir: &Path, source: &Source) -> Result<()> {
    if dir.join(".git").exists() {
        return update(dir, source);
    }

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.depth(1);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    builder.clone(&source.url, dir)?;

    info!(name = %source.name, url = %source.url, "cloned repository");
    Ok(())
}

/// Fast-forward the checked-out branch to the remote tip.
///
/// Anything that would require a merge is an error; callers decide whether
/// that is fatal.
pub(super) fn update(dir: &Path, source: &Source) -> Result<()> {
    if !dir.join(".git").exists() {
        return add(dir, source);
    }

    let repo = Repository::open(dir)?;
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&[] as &[&str], None, None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        debug!(name = %source.name, "repository already up to date");
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        return Err(Error::Git(format!(
            "repository '{}' diverged from its remote and cannot fast-forward",
            source.name
        )));
    }

    let head = repo.head()?;
    let refname = head
        .name()
        .ok_or_else(|| Error::Git("HEAD is not a named reference".into()))?
        .to_string();
    let mut reference = repo.find_reference(&refname)?;
    reference.set_target(fetch_commit.id(), "fast-forward")?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;

    info!(name = %source.name, "fast-forwarded repository");
    Ok(())
}
