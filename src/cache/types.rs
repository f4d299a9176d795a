use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::tags::TagSet;

/// A cached result: serialized payload plus the tags it is invalidated by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub tags: TagSet,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl` from now.
    pub fn new(key: impl Into<String>, tags: TagSet, payload: Vec<u8>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            key: key.into(),
            tags,
            payload,
            created_at,
            expires_at: expiry_from(created_at, ttl),
        }
    }

    /// The full lifetime the entry was created with.
    #[inline]
    pub fn ttl(&self) -> Duration {
        (self.expires_at - self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Time left before `expires_at`, zero once passed.
    #[inline]
    pub fn time_to_live(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Same entry with its full TTL restarted at `now`.
    pub fn refreshed(&self, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            expires_at: expiry_from(now, self.ttl()),
            ..self.clone()
        }
    }
}

fn expiry_from(start: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Point-in-time counters of a [`CacheCoordinator`](super::CacheCoordinator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's computation.
    pub coalesced: u64,
    /// Computations run without the cache because it was unavailable.
    pub fail_open: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Hits over lookups that reached the store, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub coalesced: AtomicU64,
    pub fail_open: AtomicU64,
    pub invalidations: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
