use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_INVALIDATION_RETRIES, INVALIDATION_BACKOFF_MS,
};

/// Settings for [`MemoryTagStore`](super::MemoryTagStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Max live entries before size-based eviction.
    pub capacity: u64,
    /// Restart an entry's TTL every time it is read.
    pub refresh_on_hit: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            refresh_on_hit: false,
        }
    }
}

impl MemoryStoreConfig {
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_refresh_on_hit(mut self, refresh: bool) -> Self {
        self.refresh_on_hit = refresh;
        self
    }
}

/// Settings for [`CacheCoordinator`](super::CacheCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Extra attempts after a failed invalidation.
    pub invalidation_retries: u32,
    /// Base delay between invalidation attempts; grows linearly per attempt.
    pub invalidation_backoff: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            invalidation_retries: DEFAULT_INVALIDATION_RETRIES,
            invalidation_backoff: Duration::from_millis(INVALIDATION_BACKOFF_MS),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.invalidation_retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.invalidation_backoff = backoff;
        self
    }
}
