//! In-memory cache tier
//!
//! Authoritative view of the cache for the current process lifetime. Lost on
//! restart; the durable tier refills it lazily on read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::CacheEntry;

/// Concurrent key -> entry map shared by all in-flight requests.
///
/// Every operation takes the lock once, so each is atomic with respect to the
/// others; no further ordering is guaranteed or needed.
pub struct MemoryTier {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key, lazily evicting it if expired.
    ///
    /// Expired entries are removed as a side effect of the read that
    /// discovers them, so this tier never serves stale data and never needs
    /// the sweeper for correctness.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = {
            let entries = self.entries.read().await;
            entries.get(key).cloned()
        };

        let entry = entry?;
        if entry.is_expired(Utc::now()) {
            debug!(key = %key, "Memory entry expired, evicting");
            let mut entries = self.entries.write().await;
            // Re-check under the write lock: a concurrent set may have
            // replaced the entry with a fresh one since we looked.
            if entries.get(key).is_some_and(|e| e.is_expired(Utc::now())) {
                entries.remove(key);
            }
            return None;
        }

        Some(entry)
    }

    /// Insert or fully replace an entry
    pub async fn set(&self, key: &str, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
    }

    /// Remove a single key, reporting whether it was present
    pub async fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    /// Remove every entry whose key satisfies the predicate, returning the
    /// number removed
    pub async fn delete_matching<F>(&self, pred: F) -> u64
    where
        F: Fn(&str) -> bool,
    {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !pred(key));
        (before - entries.len()) as u64
    }

    /// Drop all entries, returning how many were held
    pub async fn clear(&self) -> u64 {
        let mut entries = self.entries.write().await;
        let count = entries.len() as u64;
        entries.clear();
        count
    }

    /// Remove entries that are expired as of `now`
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> u64 {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        (before - entries.len()) as u64
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}
