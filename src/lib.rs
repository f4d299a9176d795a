//! Quarry library crate: a criteria-driven repository core.
//!
//! # Public API Surface
//!
//! ## Request DSL
//! - [`parse`], [`QuerySpec`], [`ParseError`] - Query parameters to a typed request
//! - [`to_params`] - Typed request back to query parameters
//!
//! ## Criteria
//! - [`Criterion`], [`CriteriaPipeline`] - Composable query transformations
//! - [`CriteriaResolver`] - Opaque id decoding and search term expansion
//! - [`QueryBuilder`] - The seam a storage backend implements
//!
//! ## Cache
//! - [`CacheCoordinator`] - Single-flight reads and tag invalidation
//! - [`TagCacheStore`], [`MemoryTagStore`] - Tag-indexed entry storage
//! - [`derive_key`], [`tags_for_query`], [`tags_for_entity`] - Keys and tags
//!
//! ## Repository
//! - [`Repository`], [`RepositoryConfig`], [`Page`] - Reads and writes for one entity
//! - [`EntityStore`] - The persisted-entity backend
//! - [`Config`] - Environment configuration
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod criteria;
pub mod dsl;
pub mod hashing;
pub mod identity;
pub mod query;
pub mod repository;
pub mod store;
pub mod tags;
pub mod telemetry;

pub use cache::{
    CacheCoordinator, CacheEntry, CacheError, CacheResult, CacheStats, CacheStoreError,
    CacheStoreResult, CoordinatorConfig, MemoryStoreConfig, MemoryTagStore, TagCacheStore,
    TagIndex,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockTagStore;

pub use config::{Config, ConfigError};
pub use criteria::{CriteriaPipeline, CriteriaResolver, Criterion};
pub use dsl::{
    FieldComparison, FilterSpec, IncludeKind, IncludePath, IncludeSpec, JoinType, Operator,
    ParseError, ParseErrorKind, ParseResult, QuerySpec, RequestParams, Scalar, SearchSpec,
    SortDirection, SortKey, SortSpec, parse, to_params,
};
pub use hashing::{CacheKey, derive_key};
#[cfg(any(test, feature = "mock"))]
pub use identity::PrefixTranscoder;
pub use identity::{DecodeError, DecodePolicy, IdTranscoder, NumericTranscoder};
#[cfg(any(test, feature = "mock"))]
pub use query::{BuilderCall, RecordingBuilder};
pub use query::{Predicate, PredicateGroup, QueryBuilder};
pub use repository::{Page, Repository, RepositoryConfig, RepositoryError, RepositoryResult};
#[cfg(any(test, feature = "mock"))]
pub use store::MockEntityStore;
pub use store::{Attributes, EntityStore, StoreError, StoreResult};
pub use tags::{TagSet, tags_for_entity, tags_for_query};
pub use telemetry::init_tracing;
