//! Repository core: criteria, cache coordination and the entity store behind one API.
//!
//! Every read resolves its pipeline (id decoding, search term expansion), derives a
//! cache key and query tags from the applied criteria, and runs the store query
//! inside [`CacheCoordinator::get_or_compute`]. Every write goes to the store first
//! and then invalidates the entity's write tags.

pub mod config;
pub mod error;
pub mod types;


pub use config::RepositoryConfig;
pub use error::{RepositoryError, RepositoryResult};
pub use types::Page;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheCoordinator, TagCacheStore};
use crate::constants::{
    METHOD_ALL, METHOD_COUNT, METHOD_FIND, METHOD_FIND_BY_FIELD, METHOD_FIND_MANY, METHOD_FIRST,
    METHOD_PAGINATE,
};
use crate::criteria::resolve::literal;
use crate::criteria::{CriteriaPipeline, CriteriaResolver, Criterion};
use crate::dsl::{FilterSpec, Operator, Scalar, parse};
use crate::hashing::derive_key;
use crate::identity::{DecodeError, DecodePolicy, IdTranscoder, NumericTranscoder};
use crate::store::{Attributes, EntityStore, StoreError, StoreResult};
use crate::tags::{tags_for_entity, tags_for_query};

/// Reads and writes one entity type.
pub struct Repository<S: EntityStore, C: TagCacheStore> {
    store: S,
    cache: CacheCoordinator<C>,
    transcoder: Arc<dyn IdTranscoder>,
    searchable: Vec<(String, Operator)>,
    resolver: CriteriaResolver,
    config: RepositoryConfig,
}

impl<S, C> std::fmt::Debug for Repository<S, C>
where
    S: EntityStore,
    C: TagCacheStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity_type", &self.store.entity_type())
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore, C: TagCacheStore> Repository<S, C> {
    pub fn new(store: S, cache: CacheCoordinator<C>) -> Self {
        let transcoder: Arc<dyn IdTranscoder> = Arc::new(NumericTranscoder);
        let config = RepositoryConfig::default();
        Self {
            resolver: CriteriaResolver::new(Arc::clone(&transcoder), config.decode_policy),
            store,
            cache,
            transcoder,
            searchable: Vec::new(),
            config,
        }
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self.rebuild_resolver();
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn IdTranscoder>) -> Self {
        self.transcoder = transcoder;
        self.rebuild_resolver();
        self
    }

    /// Fields a bare search term is matched against when the request names none.
    pub fn with_searchable<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, Operator)>,
        F: Into<String>,
    {
        self.searchable = fields.into_iter().map(|(f, op)| (f.into(), op)).collect();
        self.rebuild_resolver();
        self
    }

    fn rebuild_resolver(&mut self) {
        self.resolver =
            CriteriaResolver::new(Arc::clone(&self.transcoder), self.config.decode_policy)
                .with_searchable(self.searchable.clone());
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &CacheCoordinator<C> {
        &self.cache
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn entity_type(&self) -> &str {
        self.store.entity_type()
    }

    /// Parses raw request parameters into a pipeline holding one request criterion.
    pub fn pipeline_from_params<I, K, V>(&self, params: I) -> RepositoryResult<CriteriaPipeline>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(CriteriaPipeline::from_request(parse(params)?))
    }

    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn all(&self, pipeline: &CriteriaPipeline) -> RepositoryResult<Vec<S::Record>> {
        let pipeline = pipeline.clone().resolve(&self.resolver);
        self.read(METHOD_ALL, &[], &pipeline, |query| self.store.fetch(query))
            .await
    }

    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn first(&self, pipeline: &CriteriaPipeline) -> RepositoryResult<Option<S::Record>> {
        let pipeline = pipeline
            .extended([Criterion::Limit {
                limit: 1,
                offset: 0,
            }])
            .resolve(&self.resolver);
        self.read(METHOD_FIRST, &[], &pipeline, |query| async move {
            Ok::<_, StoreError>(self.store.fetch(query).await?.into_iter().next())
        })
        .await
    }

    /// Looks a record up by primary key. Text ids go through the transcoder.
    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn find(
        &self,
        id: impl Into<Scalar>,
        pipeline: &CriteriaPipeline,
    ) -> RepositoryResult<Option<S::Record>> {
        let id = id.into();
        let args = [to_value(&id)?];
        let pipeline = pipeline
            .extended([
                Criterion::Where(FilterSpec::eq(self.store.primary_key(), id)),
                Criterion::Limit {
                    limit: 1,
                    offset: 0,
                },
            ])
            .resolve(&self.resolver);
        self.read(METHOD_FIND, &args, &pipeline, |query| async move {
            Ok::<_, StoreError>(self.store.fetch(query).await?.into_iter().next())
        })
        .await
    }

    /// Looks several records up concurrently; ids with no record are left out. Each
    /// lookup is cached as a `find`, unless `find_many` itself is excluded from caching.
    #[instrument(skip_all, fields(entity = self.store.entity_type(), ids = ids.len()))]
    pub async fn find_many(
        &self,
        ids: Vec<Scalar>,
        pipeline: &CriteriaPipeline,
    ) -> RepositoryResult<Vec<S::Record>> {
        let pipeline = if self.config.caches(METHOD_FIND_MANY) {
            pipeline.clone()
        } else {
            pipeline.clone().without_cache()
        };
        let lookups = ids.into_iter().map(|id| self.find(id, &pipeline));
        let mut records = Vec::new();
        for found in join_all(lookups).await {
            records.extend(found?);
        }
        Ok(records)
    }

    #[instrument(skip_all, fields(entity = self.store.entity_type(), field = field))]
    pub async fn find_by_field(
        &self,
        field: &str,
        value: impl Into<Scalar>,
        pipeline: &CriteriaPipeline,
    ) -> RepositoryResult<Vec<S::Record>> {
        let value = value.into();
        let args = [Value::from(field), to_value(&value)?];
        let pipeline = pipeline
            .extended([Criterion::Where(FilterSpec::eq(field, value))])
            .resolve(&self.resolver);
        self.read(METHOD_FIND_BY_FIELD, &args, &pipeline, |query| {
            self.store.fetch(query)
        })
        .await
    }

    /// Returns 1-based page `page`. `per_page` falls back to the configured size.
    #[instrument(skip_all, fields(entity = self.store.entity_type(), page = page))]
    pub async fn paginate(
        &self,
        page: u64,
        per_page: Option<u64>,
        pipeline: &CriteriaPipeline,
    ) -> RepositoryResult<Page<S::Record>> {
        let page = page.max(1);
        let per_page = per_page.unwrap_or(self.config.per_page).max(1);
        let args = [Value::from(page), Value::from(per_page)];
        let pipeline = pipeline.clone().resolve(&self.resolver);
        let window = Criterion::Limit {
            limit: per_page,
            offset: (page - 1).saturating_mul(per_page),
        };
        let (store, scope) = (&self.store, &pipeline);

        // Count and window fetch share one cache entry so a page never disagrees
        // with its total.
        self.read(METHOD_PAGINATE, &args, &pipeline, move |query| async move {
            let total = store.count(scope.apply_all(store.query())).await?;
            let items = store.fetch(window.apply(query)).await?;
            Ok::<_, StoreError>(Page {
                items,
                total,
                page,
                per_page,
            })
        })
        .await
    }

    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn count(&self, pipeline: &CriteriaPipeline) -> RepositoryResult<u64> {
        let pipeline = pipeline.clone().resolve(&self.resolver);
        self.read(METHOD_COUNT, &[], &pipeline, |query| self.store.count(query))
            .await
    }

    /// Inserts a record and invalidates the entity's cached reads.
    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn create(&self, attributes: Attributes) -> RepositoryResult<S::Record> {
        let changed: Vec<String> = attributes.keys().cloned().collect();
        let record = self.store.insert(attributes).await?;
        let id = self.store.record_id(&record).unwrap_or(Scalar::Null);
        self.invalidate(&id, &changed).await;
        Ok(record)
    }

    /// Applies `attributes` to record `id`; the attribute names are the changed fields.
    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn update(
        &self,
        id: impl Into<Scalar>,
        attributes: Attributes,
    ) -> RepositoryResult<S::Record> {
        let id = self.decode_id(id.into())?;
        let changed: Vec<String> = attributes.keys().cloned().collect();
        let record = self.store.update(&id, attributes).await?;
        self.invalidate(&id, &changed).await;
        Ok(record)
    }

    #[instrument(skip_all, fields(entity = self.store.entity_type()))]
    pub async fn delete(&self, id: impl Into<Scalar>) -> RepositoryResult<bool> {
        let id = self.decode_id(id.into())?;
        let removed = self.store.delete(&id).await?;
        if removed {
            self.invalidate(&id, &[] as &[String]).await;
        }
        Ok(removed)
    }

    /// Drops every cached read of this entity type.
    pub async fn flush_cache(&self) -> RepositoryResult<()> {
        let tags = tags_for_query(self.store.entity_type(), &[]);
        if let Err(e) = self.cache.invalidate(&tags).await {
            warn!(error = %e, "cache flush left pending");
        }
        Ok(())
    }

    async fn read<V, F, Fut>(
        &self,
        method: &str,
        args: &[Value],
        pipeline: &CriteriaPipeline,
        run: F,
    ) -> RepositoryResult<V>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce(S::Builder) -> Fut + Send,
        Fut: Future<Output = StoreResult<V>> + Send,
    {
        let query = pipeline.apply_all(self.store.query());
        if !self.config.caches(method) || pipeline.skip_cache() {
            debug!(method, "reading without cache");
            return Ok(run(query).await?);
        }

        let entity_type = self.store.entity_type();
        let criteria = pipeline.applied();
        let key = derive_key(entity_type, method, args, criteria)?;
        let tags = tags_for_query(entity_type, criteria);

        let value = self
            .cache
            .get_or_compute(&key, tags, self.config.ttl, move || run(query))
            .await?;
        Ok(value)
    }

    async fn invalidate<F: AsRef<str>>(&self, id: &Scalar, changed: &[F]) {
        let tags = tags_for_entity(self.store.entity_type(), id, changed);
        // The write is committed; a failed invalidation is parked and retried by the
        // coordinator, which bypasses the cache until it succeeds.
        if let Err(e) = self.cache.invalidate(&tags).await {
            debug!(error = %e, "invalidation deferred");
        }
    }

    fn decode_id(&self, id: Scalar) -> Result<Scalar, DecodeError> {
        let Scalar::Text(token) = id else {
            return Ok(id);
        };
        if let Some(decoded) = self.transcoder.decode(&token) {
            return Ok(Scalar::Int(decoded));
        }
        match self.config.decode_policy {
            DecodePolicy::NoMatch => Err(DecodeError {
                field: self.store.primary_key().to_string(),
                token,
            }),
            DecodePolicy::Literal => Ok(literal(token)),
        }
    }
}

fn to_value(scalar: &Scalar) -> serde_json::Result<Value> {
    serde_json::to_value(scalar)
}
