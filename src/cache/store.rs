use std::future::Future;
use std::sync::Arc;

use super::error::CacheStoreResult;
use super::types::CacheEntry;
use crate::tags::TagSet;

/// Key/value store with tag-set invalidation.
///
/// Implementations keep a tag index (tag to keys) and must make `put` and
/// `invalidate_tags` atomic with respect to `get`: a reader never observes an
/// invalidation half-applied.
pub trait TagCacheStore: Send + Sync {
    /// Returns the live entry for `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = CacheStoreResult<Option<Arc<CacheEntry>>>> + Send;

    /// Stores `entry`, replacing any entry under the same key, and unions its key
    /// into the key-set of every tag it carries.
    fn put(&self, entry: CacheEntry) -> impl Future<Output = CacheStoreResult<()>> + Send;

    /// Removes every entry tagged with any of `tags`. Returns how many were removed.
    fn invalidate_tags(
        &self,
        tags: &TagSet,
    ) -> impl Future<Output = CacheStoreResult<usize>> + Send;

    /// Number of live entries.
    fn len(&self) -> impl Future<Output = CacheStoreResult<u64>> + Send;
}
