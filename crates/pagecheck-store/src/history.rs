use crate::clock::{Clock, SystemClock};
use crate::storage::Storage;
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use pagecheck_core::{NormalizedReport, Scores, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage key holding the history log
pub const HISTORY_KEY: &str = "pagecheck_history";

/// Most entries kept; older ones are evicted on append
pub const MAX_HISTORY_ENTRIES: usize = 100;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Summary of one past analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    /// Capture time of the report, epoch milliseconds
    pub timestamp: i64,
    pub scores: Scores,
    pub overall_score: u8,
    pub strategy: Strategy,
    #[serde(default)]
    pub is_favorite: bool,
}

impl HistoryEntry {
    pub fn from_report(report: &NormalizedReport) -> Self {
        let timestamp = report.timestamp.timestamp_millis();
        Self {
            id: format!("{}_{}_{}", report.url, report.strategy, timestamp),
            url: report.url.clone(),
            timestamp,
            scores: report.scores,
            overall_score: report.overall_score,
            strategy: report.strategy,
            is_favorite: false,
        }
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    fn same_target(&self, url: &str, strategy: Strategy) -> bool {
        self.url == url && self.strategy == strategy
    }
}

/// Counts over rolling windows ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub this_month: usize,
    pub average_score: u8,
}

/// Entries captured on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub count: usize,
    pub average_score: u8,
    pub entries: Vec<HistoryEntry>,
}

/// Most-recent-first log of analyses, one entry per (url, strategy).
///
/// Reads and writes go straight to storage. Persistence failures are logged
/// and the operation degrades to a no-op.
pub struct HistoryStore<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    capacity: usize,
}

impl<S: Storage> HistoryStore<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> HistoryStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            capacity: MAX_HISTORY_ENTRIES,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// All entries, most recent first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to load history: {}", e);
                Vec::new()
            }
        }
    }

    /// Record a report, replacing any entry for the same url and strategy
    pub fn append(&self, report: &NormalizedReport) {
        let entry = HistoryEntry::from_report(report);
        let mut entries = self.entries();
        entries.retain(|existing| !existing.same_target(&entry.url, entry.strategy));
        entries.insert(0, entry);
        entries.truncate(self.capacity);
        tracing::debug!("History now holds {} entries", entries.len());
        self.save(&entries);
    }

    /// Returns whether an entry was removed
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if removed {
            self.save(&entries);
        }
        removed
    }

    /// Flip the favorite flag, returning the new value if the entry exists
    pub fn toggle_favorite(&self, id: &str) -> Option<bool> {
        let mut entries = self.entries();
        let entry = entries.iter_mut().find(|entry| entry.id == id)?;
        entry.is_favorite = !entry.is_favorite;
        let flag = entry.is_favorite;
        self.save(&entries);
        Some(flag)
    }

    pub fn clear(&self) {
        self.save(&[]);
    }

    pub fn find(&self, id: &str) -> Option<HistoryEntry> {
        self.entries().into_iter().find(|entry| entry.id == id)
    }

    pub fn list_by_url(&self, url: &str) -> Vec<HistoryEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.url == url)
            .collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let entries = self.entries();
        let now = self.clock.now_ms();
        let within = |days: i64| {
            entries
                .iter()
                .filter(|entry| now - entry.timestamp < days * DAY_MS)
                .count()
        };

        HistoryStats {
            total: entries.len(),
            today: within(1),
            this_week: within(7),
            this_month: within(30),
            average_score: average_score(&entries),
        }
    }

    /// Entries grouped by UTC capture date, newest date first
    pub fn timeline(&self) -> Vec<DailySummary> {
        let mut by_date: BTreeMap<NaiveDate, Vec<HistoryEntry>> = BTreeMap::new();
        for entry in self.entries() {
            match entry.captured_at() {
                Some(at) => by_date.entry(at.date_naive()).or_default().push(entry),
                None => tracing::debug!("Skipping entry {} with invalid timestamp", entry.id),
            }
        }

        by_date
            .into_iter()
            .rev()
            .map(|(date, entries)| DailySummary {
                date,
                count: entries.len(),
                average_score: average_score(&entries),
                entries,
            })
            .collect()
    }

    fn load(&self) -> Result<Vec<HistoryEntry>> {
        match self.storage.get_item(HISTORY_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: &[HistoryEntry]) {
        let written = serde_json::to_string(entries)
            .map_err(crate::Error::from)
            .and_then(|json| self.storage.set_item(HISTORY_KEY, &json));
        if let Err(e) = written {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}

/// Mean overall score rounded half up; 0 for no entries
fn average_score(entries: &[HistoryEntry]) -> u8 {
    if entries.is_empty() {
        return 0;
    }
    let count = entries.len() as u64;
    let sum: u64 = entries.iter().map(|entry| u64::from(entry.overall_score)).sum();
    ((2 * sum + count) / (2 * count)) as u8
}
