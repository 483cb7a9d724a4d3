// Local persistence: report cache, analysis history, favorites

mod cache;
mod clock;
mod error;
mod favorites;
mod history;
mod storage;

#[cfg(test)]
mod testing;

pub use cache::{CACHE_NAMESPACE, CACHE_TTL_MINUTES, Cache, CacheItem};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use favorites::{FAVORITES_KEY, FavoriteEntry, FavoritesStore};
pub use history::{DailySummary, HISTORY_KEY, HistoryEntry, HistoryStats, HistoryStore, MAX_HISTORY_ENTRIES};
pub use storage::{FileStorage, MemoryStorage, Storage};
