//! Read-through cache coordination with single-flight and tag invalidation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::config::CoordinatorConfig;
use super::error::{CacheError, CacheResult, CacheStoreError};
use super::flight::{self, Flight, FlightState, FlightTable, Shared};
use super::store::TagCacheStore;
use super::types::{CacheEntry, CacheStats, StatsCounters};
use crate::hashing::CacheKey;
use crate::tags::{TagSet, entity_tag};

struct CoordinatorInner<S> {
    store: S,
    config: CoordinatorConfig,
    flights: FlightTable,
    /// Puts hold the read side, invalidations the write side.
    gate: RwLock<()>,
    /// Bumped by every invalidation; a leader only stores if it is unchanged.
    epoch: AtomicU64,
    /// Tags whose invalidation has not been confirmed by the store.
    pending: parking_lot::Mutex<TagSet>,
    stats: StatsCounters,
}

/// Shared handle over a [`TagCacheStore`].
///
/// `get_or_compute` runs at most one computation per key at a time. Concurrent
/// callers for the same key wait for that computation and receive a clone of its
/// outcome, error included. A computation that overlapped an invalidation is
/// returned to its callers but never stored.
pub struct CacheCoordinator<S: TagCacheStore> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: TagCacheStore> Clone for CacheCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TagCacheStore + std::fmt::Debug> std::fmt::Debug for CacheCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .field("in_flight", &self.inner.flights.in_flight())
            .finish_non_exhaustive()
    }
}

impl<S: TagCacheStore> CacheCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                config,
                flights: FlightTable::default(),
                gate: RwLock::new(()),
                epoch: AtomicU64::new(0),
                pending: parking_lot::Mutex::new(TagSet::new()),
                stats: StatsCounters::default(),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Tags parked after a failed invalidation.
    pub fn pending_tags(&self) -> TagSet {
        self.inner.pending.lock().clone()
    }

    /// Computations currently registered as in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.flights.in_flight()
    }

    /// Returns the cached value under `key`, or runs `compute` and caches its
    /// successful result under `tags` (plus the key's entity tag) for `ttl`.
    ///
    /// Store outages fail open: the value is computed without the cache. While a
    /// failed invalidation is unresolved every call bypasses the cache.
    #[instrument(skip(self, tags, compute), fields(key = %key, ttl_secs = ttl.as_secs()))]
    pub async fn get_or_compute<V, E, F, Fut>(
        &self,
        key: &CacheKey,
        tags: TagSet,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
    {
        let inner = &*self.inner;

        if !self.flush_pending().await {
            StatsCounters::bump(&inner.stats.fail_open);
            debug!("invalidation still pending, bypassing cache");
            return compute().await;
        }

        let mut tags = tags;
        tags.insert(entity_tag(key.entity_type()));

        loop {
            match self.lookup::<V>(key).await {
                Ok(Some(value)) => {
                    StatsCounters::bump(&inner.stats.hits);
                    debug!("cache hit");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => {
                    StatsCounters::bump(&inner.stats.fail_open);
                    warn!(error = %e, "cache store unavailable, computing without cache");
                    return compute().await;
                }
            }

            match inner.flights.join(key.as_str()) {
                Flight::Leader(guard) => {
                    // A flight that settled between the lookup and the join has stored already.
                    if let Ok(Some(value)) = self.lookup::<V>(key).await {
                        StatsCounters::bump(&inner.stats.hits);
                        guard.complete(Ok(Arc::new(value.clone()) as Shared));
                        return Ok(value);
                    }

                    StatsCounters::bump(&inner.stats.misses);
                    let epoch = inner.epoch.load(Ordering::SeqCst);
                    debug!("cache miss, computing");

                    let outcome = compute().await;
                    let shared: Result<Shared, Shared> = match &outcome {
                        Ok(value) => {
                            self.populate(key, &tags, ttl, value, epoch).await;
                            Ok(Arc::new(value.clone()) as Shared)
                        }
                        Err(error) => Err(Arc::new(error.clone()) as Shared),
                    };
                    guard.complete(shared);
                    return outcome;
                }
                Flight::Follower(rx) => {
                    StatsCounters::bump(&inner.stats.coalesced);
                    debug!("joining in-flight computation");

                    match flight::wait(rx).await {
                        FlightState::Done(Ok(shared)) => match shared.downcast::<V>() {
                            Ok(value) => return Ok(value.as_ref().clone()),
                            Err(_) => {
                                warn!("in-flight value has a different type, computing");
                                return compute().await;
                            }
                        },
                        FlightState::Done(Err(shared)) => match shared.downcast::<E>() {
                            Ok(error) => return Err(error.as_ref().clone()),
                            Err(_) => {
                                warn!("in-flight error has a different type, computing");
                                return compute().await;
                            }
                        },
                        FlightState::Abandoned | FlightState::Running => {
                            debug!("leader abandoned the computation, retrying");
                        }
                    }
                }
            }
        }
    }

    /// Removes every entry tagged with any of `tags`, retrying with backoff.
    ///
    /// On final failure the tags are parked, subsequent reads bypass the cache,
    /// and every later call retries them first.
    #[instrument(skip(self, tags), fields(tag_count = tags.len()))]
    pub async fn invalidate(&self, tags: &TagSet) -> CacheResult<usize> {
        if tags.is_empty() {
            return Ok(0);
        }
        let inner = &*self.inner;

        let mut all = inner.pending.lock().clone();
        all.extend(tags.iter().cloned());

        match self
            .invalidate_with_retry(&all, inner.config.invalidation_retries)
            .await
        {
            Ok(removed) => {
                clear_pending(&inner.pending, &all);
                debug!(removed, "invalidated tags");
                Ok(removed)
            }
            Err((attempts, source)) => {
                inner.pending.lock().extend(tags.iter().cloned());
                warn!(
                    attempts,
                    error = %source,
                    "invalidation failed; bypassing cache until it succeeds"
                );
                Err(CacheError::InvalidationFailed {
                    tags: all,
                    attempts,
                    source,
                })
            }
        }
    }

    async fn flush_pending(&self) -> bool {
        let inner = &*self.inner;
        let pending = inner.pending.lock().clone();
        if pending.is_empty() {
            return true;
        }
        match self.invalidate_with_retry(&pending, 0).await {
            Ok(removed) => {
                clear_pending(&inner.pending, &pending);
                info!(removed, tags = pending.len(), "flushed pending invalidation");
                true
            }
            Err((_, e)) => {
                debug!(error = %e, "pending invalidation still failing");
                false
            }
        }
    }

    async fn invalidate_with_retry(
        &self,
        tags: &TagSet,
        retries: u32,
    ) -> Result<usize, (u32, CacheStoreError)> {
        let inner = &*self.inner;
        let _gate = inner.gate.write().await;
        inner.epoch.fetch_add(1, Ordering::SeqCst);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match inner.store.invalidate_tags(tags).await {
                Ok(removed) => {
                    StatsCounters::bump(&inner.stats.invalidations);
                    return Ok(removed);
                }
                Err(e) if attempt > retries => return Err((attempt, e)),
                Err(e) => {
                    debug!(attempt, error = %e, "invalidation attempt failed");
                    tokio::time::sleep(inner.config.invalidation_backoff * attempt).await;
                }
            }
        }
    }

    async fn lookup<V: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<V>, CacheStoreError> {
        let Some(entry) = self.inner.store.get(key.as_str()).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&entry.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    async fn populate<V: Serialize>(
        &self,
        key: &CacheKey,
        tags: &TagSet,
        ttl: Duration,
        value: &V,
        epoch: u64,
    ) {
        let inner = &*self.inner;
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "value not serializable, skipping cache");
                return;
            }
        };

        let _gate = inner.gate.read().await;
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("invalidated during computation, not caching");
            return;
        }
        let entry = CacheEntry::new(key.as_str(), tags.clone(), payload, ttl);
        if let Err(e) = inner.store.put(entry).await {
            warn!(error = %e, "failed to store computed value");
        }
    }
}

fn clear_pending(pending: &parking_lot::Mutex<TagSet>, flushed: &TagSet) {
    let mut pending = pending.lock();
    for tag in flushed {
        pending.remove(tag);
    }
}
