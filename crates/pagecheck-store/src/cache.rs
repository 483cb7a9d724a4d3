use crate::clock::{Clock, SystemClock};
use crate::storage::Storage;
use crate::{Error, Result};
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Prefix shared by every cache entry key
pub const CACHE_NAMESPACE: &str = "pagecheck";

/// Entries older than this many minutes are treated as absent
pub const CACHE_TTL_MINUTES: i64 = 30;

/// Stored form of a cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem<T> {
    pub data: T,
    /// Epoch milliseconds at write time
    pub timestamp: i64,
}

/// Read-through report cache with lazy TTL expiry.
///
/// Every failure is logged and swallowed: a broken cache behaves like an
/// empty one.
pub struct Cache<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    ttl: Duration,
}

impl<S: Storage> Cache<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> Cache<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Storage key for a logical cache key
    pub fn entry_key(key: &str) -> String {
        format!("{}-{}", CACHE_NAMESPACE, key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry_key = Self::entry_key(key);
        match self.read(&entry_key) {
            Ok(Some(item)) => {
                let age = self.clock.now_ms() - item.timestamp;
                if age > self.ttl.num_milliseconds() {
                    tracing::debug!("Cache entry {} expired ({}ms old)", key, age);
                    self.discard(&entry_key);
                    None
                } else {
                    tracing::debug!("Cache hit for {}", key);
                    Some(item.data)
                }
            }
            Ok(None) => {
                tracing::debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Dropping unreadable cache entry {}: {}", key, e);
                self.discard(&entry_key);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let item = CacheItem {
            data: value,
            timestamp: self.clock.now_ms(),
        };
        let written = serde_json::to_string(&item)
            .map_err(Error::from)
            .and_then(|json| self.storage.set_item(&Self::entry_key(key), &json));

        match written {
            Ok(()) => tracing::debug!("Cached {}", key),
            Err(e) => tracing::warn!("Cache write failed for {}: {}", key, e),
        }
    }

    /// Remove every cache entry, leaving other keys in the storage alone
    pub fn clear(&self) {
        for key in self.namespaced_keys() {
            self.discard(&key);
        }
    }

    /// Number of stored entries, expired ones included
    pub fn size(&self) -> usize {
        self.namespaced_keys().len()
    }

    fn read<T: DeserializeOwned>(&self, entry_key: &str) -> Result<Option<CacheItem<T>>> {
        match self.storage.get_item(entry_key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn discard(&self, entry_key: &str) {
        if let Err(e) = self.storage.remove_item(entry_key) {
            tracing::warn!("Failed to remove cache entry {}: {}", entry_key, e);
        }
    }

    fn namespaced_keys(&self) -> Vec<String> {
        let prefix = format!("{}-", CACHE_NAMESPACE);
        match self.storage.keys() {
            Ok(keys) => keys.into_iter().filter(|key| key.starts_with(&prefix)).collect(),
            Err(e) => {
                tracing::warn!("Failed to list cache entries: {}", e);
                Vec::new()
            }
        }
    }
}
