//! In-process tag cache store.
//!
//! Entries live in a moka cache with per-entry expiry taken from
//! [`CacheEntry::expires_at`]. The tag index sits behind one `RwLock`: reads hold the
//! read side across the lookup, puts and invalidations hold the write side, so an
//! invalidation is never observed half-applied.
//!
//! Moka evicts on its own schedule. The eviction listener must not touch the index
//! (it can run while the index lock is held), so it only queues the evicted key;
//! the queue is drained the next time the write lock is taken.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use moka::Expiry;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use parking_lot::{Mutex, RwLock};

use super::config::MemoryStoreConfig;
use super::error::CacheStoreResult;
use super::index::TagIndex;
use super::store::TagCacheStore;
use super::types::CacheEntry;
use crate::tags::TagSet;

struct EntryExpiry;

impl Expiry<String, Arc<CacheEntry>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.time_to_live(Utc::now()))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.time_to_live(Utc::now()))
    }
}

/// Moka-backed [`TagCacheStore`]. Cloning shares the same entries and index.
#[derive(Clone)]
pub struct MemoryTagStore {
    entries: Cache<String, Arc<CacheEntry>>,
    index: Arc<RwLock<TagIndex>>,
    evicted: Arc<Mutex<Vec<String>>>,
    config: MemoryStoreConfig,
}

impl MemoryTagStore {
    /// Creates a store with the default capacity.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::clone(&evicted);
        let entries = Cache::builder()
            .max_capacity(config.capacity)
            .expire_after(EntryExpiry)
            .eviction_listener(move |key: Arc<String>, _entry, cause: RemovalCause| {
                // Explicit and Replaced removals are already reflected in the index.
                if cause.was_evicted() {
                    queue.lock().push(key.as_ref().clone());
                }
            })
            .build();

        Self {
            entries,
            index: Arc::new(RwLock::new(TagIndex::new())),
            evicted,
            config,
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Returns the live entry for `key`, restarting its TTL if configured to.
    pub fn lookup(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let _index = self.index.read();
        let entry = self.entries.get(key)?;
        let now = Utc::now();
        if entry.is_expired(now) {
            return None;
        }
        if self.config.refresh_on_hit {
            let refreshed = Arc::new(entry.refreshed(now));
            self.entries.insert(key.to_string(), Arc::clone(&refreshed));
            return Some(refreshed);
        }
        Some(entry)
    }

    pub fn insert(&self, entry: CacheEntry) {
        let mut index = self.index.write();
        self.reclaim(&mut index);
        index.insert(&entry.key, &entry.tags);
        self.entries.insert(entry.key.clone(), Arc::new(entry));
    }

    /// Removes every entry tagged with any of `tags`.
    pub fn invalidate(&self, tags: &TagSet) -> usize {
        let mut index = self.index.write();
        self.reclaim(&mut index);
        let keys = index.take_keys(tags);
        for key in &keys {
            self.entries.invalidate(key);
        }
        keys.len()
    }

    /// Keys currently registered under `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> Vec<String> {
        let mut keys: Vec<String> = self.index.read().keys_for_tag(tag).into_iter().collect();
        keys.sort();
        keys
    }

    /// Number of keys the tag index is tracking.
    pub fn indexed_keys(&self) -> usize {
        self.index.read().key_count()
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    pub fn clear(&self) {
        let mut index = self.index.write();
        index.clear();
        self.entries.invalidate_all();
        self.evicted.lock().clear();
    }

    /// Runs moka's pending maintenance and prunes evicted keys from the index.
    ///
    /// Expired entries are reported with roughly one second of granularity, so
    /// an index entry can outlive its deadline by about that much.
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
        let mut index = self.index.write();
        self.reclaim(&mut index);
    }

    fn reclaim(&self, index: &mut TagIndex) {
        let evicted = std::mem::take(&mut *self.evicted.lock());
        for key in evicted {
            // A re-put after eviction owns the registration now.
            if !self.entries.contains_key(&key) {
                index.remove_key(&key);
            }
        }
    }
}

impl Default for MemoryTagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTagStore")
            .field("entries", &self.entries.entry_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TagCacheStore for MemoryTagStore {
    async fn get(&self, key: &str) -> CacheStoreResult<Option<Arc<CacheEntry>>> {
        Ok(self.lookup(key))
    }

    async fn put(&self, entry: CacheEntry) -> CacheStoreResult<()> {
        self.insert(entry);
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &TagSet) -> CacheStoreResult<usize> {
        Ok(self.invalidate(tags))
    }

    async fn len(&self) -> CacheStoreResult<u64> {
        self.entries.run_pending_tasks();
        Ok(self.entries.entry_count())
    }
}
