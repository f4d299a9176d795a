use thiserror::Error;

use crate::tags::TagSet;

#[derive(Debug, Clone, Error)]
/// Errors returned by a tag cache store.
pub enum CacheStoreError {
    /// The backend could not be reached.
    #[error("cache store unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },
}

/// Convenience result type for cache store operations.
pub type CacheStoreResult<T> = Result<T, CacheStoreError>;

#[derive(Debug, Error)]
/// Errors surfaced by the cache coordinator.
pub enum CacheError {
    /// Invalidation kept failing; the tags are parked and reads bypass the cache
    /// until a later call manages to flush them.
    #[error("invalidation of {} tag(s) failed after {attempts} attempt(s): {source}", .tags.len())]
    InvalidationFailed {
        tags: TagSet,
        attempts: u32,
        #[source]
        source: CacheStoreError,
    },
}

/// Convenience result type for coordinator operations.
pub type CacheResult<T> = Result<T, CacheError>;
