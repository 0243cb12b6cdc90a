//! The favorites store: a flat JSON array of pinned links.
//!
//! Lives at `<user_config>/freectl/favourites.json` and follows the same
//! atomic-rename discipline as every other persisted file. Read-modify-write
//! is atomic within this process; a concurrent writer in another process is
//! a known, unprotected race.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::settings::Settings;
use crate::types::Favorite;
use crate::{Error, Result};

const FAVORITES_FILE: &str = "favourites.json";

/// Handle to the favorites file.
pub struct FavoritesStore {
    path: PathBuf,
}

impl FavoritesStore {
    /// Open the store at the default config location.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: Settings::config_dir()?.join(FAVORITES_FILE),
        })
    }

    /// Open the store at an explicit path (tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// All favorites, in insertion order. A missing file is an empty list.
    pub fn list(&self) -> Result<Vec<Favorite>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Pin a link. Duplicate links conflict.
    pub fn add(&self, favorite: Favorite) -> Result<()> {
        let mut favorites = self.list()?;
        if favorites.iter().any(|f| f.link == favorite.link) {
            return Err(Error::Conflict(format!(
                "'{}' is already a favorite",
                favorite.link
            )));
        }
        favorites.push(favorite);
        self.write(&favorites)
    }

    /// Unpin a link by its URL.
    pub fn remove(&self, link: &str) -> Result<()> {
        let mut favorites = self.list()?;
        let before = favorites.len();
        favorites.retain(|f| f.link != link);
        if favorites.len() == before {
            return Err(Error::NotFound(format!("'{link}' is not a favorite")));
        }
        self.write(&favorites)
    }

    /// Whether a link is pinned.
    pub fn contains(&self, link: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|f| f.link == link))
    }

    fn write(&self, favorites: &[Favorite]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(favorites)?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(count = favorites.len(), "favorites saved");
        Ok(())
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
