use crate::clock::{Clock, SystemClock};
use crate::storage::Storage;
use crate::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Storage key holding the favorites list
pub const FAVORITES_KEY: &str = "pagecheck_favorites";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub url: String,
    pub name: String,
    /// Epoch milliseconds
    pub added_at: i64,
}

/// Bookmarked URLs, newest first, unique by URL
pub struct FavoritesStore<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
}

impl<S: Storage> FavoritesStore<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> FavoritesStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    pub fn list(&self) -> Vec<FavoriteEntry> {
        match self.load() {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::warn!("Failed to load favorites: {}", e);
                Vec::new()
            }
        }
    }

    /// Bookmark a URL. Returns false when it was already a favorite.
    pub fn add(&self, url: &str, name: Option<&str>) -> bool {
        let mut favorites = self.list();
        if favorites.iter().any(|favorite| favorite.url == url) {
            tracing::debug!("{} is already a favorite", url);
            return false;
        }

        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_name(url));

        favorites.insert(
            0,
            FavoriteEntry {
                url: url.to_string(),
                name,
                added_at: self.clock.now_ms(),
            },
        );
        self.save(&favorites);
        true
    }

    pub fn remove(&self, url: &str) -> bool {
        let mut favorites = self.list();
        let before = favorites.len();
        favorites.retain(|favorite| favorite.url != url);
        let removed = favorites.len() != before;
        if removed {
            self.save(&favorites);
        }
        removed
    }

    pub fn rename(&self, url: &str, name: &str) -> bool {
        let mut favorites = self.list();
        let Some(favorite) = favorites.iter_mut().find(|favorite| favorite.url == url) else {
            return false;
        };
        favorite.name = name.to_string();
        self.save(&favorites);
        true
    }

    pub fn is_favorite(&self, url: &str) -> bool {
        self.list().iter().any(|favorite| favorite.url == url)
    }

    fn load(&self) -> Result<Vec<FavoriteEntry>> {
        match self.storage.get_item(FAVORITES_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, favorites: &[FavoriteEntry]) {
        let written = serde_json::to_string(favorites)
            .map_err(crate::Error::from)
            .and_then(|json| self.storage.set_item(FAVORITES_KEY, &json));
        if let Err(e) = written {
            tracing::warn!("Failed to save favorites: {}", e);
        }
    }
}

/// Host of the URL, or the URL itself when it does not parse
fn default_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
