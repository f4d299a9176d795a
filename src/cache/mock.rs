use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use super::error::{CacheStoreError, CacheStoreResult};
use super::memory::MemoryTagStore;
use super::store::TagCacheStore;
use super::types::CacheEntry;
use crate::tags::TagSet;

/// [`MemoryTagStore`] wrapper that can be switched offline or made to fail
/// invalidations, and counts calls.
#[derive(Clone, Default)]
pub struct MockTagStore {
    inner: MemoryTagStore,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    offline: AtomicBool,
    failing_invalidations: AtomicU32,
    gets: AtomicU64,
    puts: AtomicU64,
    invalidations: AtomicU64,
}

impl MockTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(inner: MemoryTagStore) -> Self {
        Self {
            inner,
            state: Arc::default(),
        }
    }

    pub fn memory(&self) -> &MemoryTagStore {
        &self.inner
    }

    /// While offline every call returns [`CacheStoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes the next `count` invalidations fail.
    pub fn fail_invalidations(&self, count: u32) {
        self.state.failing_invalidations.store(count, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> u64 {
        self.state.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u64 {
        self.state.puts.load(Ordering::SeqCst)
    }

    pub fn invalidate_calls(&self) -> u64 {
        self.state.invalidations.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> CacheStoreResult<()> {
        if self.state.offline.load(Ordering::SeqCst) {
            return Err(unavailable("mock store offline"));
        }
        Ok(())
    }
}

fn unavailable(reason: &str) -> CacheStoreError {
    CacheStoreError::Unavailable {
        reason: reason.to_string(),
    }
}

impl std::fmt::Debug for MockTagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTagStore")
            .field("inner", &self.inner)
            .field("offline", &self.state.offline.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl TagCacheStore for MockTagStore {
    async fn get(&self, key: &str) -> CacheStoreResult<Option<Arc<CacheEntry>>> {
        self.state.gets.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.get(key).await
    }

    async fn put(&self, entry: CacheEntry) -> CacheStoreResult<()> {
        self.state.puts.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.put(entry).await
    }

    async fn invalidate_tags(&self, tags: &TagSet) -> CacheStoreResult<usize> {
        self.state.invalidations.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let failing = self.state.failing_invalidations.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |n| n.checked_sub(1),
        );
        if failing.is_ok() {
            return Err(unavailable("mock invalidation failure"));
        }
        self.inner.invalidate_tags(tags).await
    }

    async fn len(&self) -> CacheStoreResult<u64> {
        self.check_online()?;
        self.inner.len().await
    }
}
