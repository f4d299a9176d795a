//! Underlying persisted-entity store the repository reads from and writes to.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEntityStore;

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::dsl::Scalar;
use crate::query::QueryBuilder;

/// Column values for inserts and updates.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Storage backend for one entity type.
///
/// Reads hand back a fresh [`QueryBuilder`] from [`query`](Self::query), let the
/// repository fold criteria over it, then execute it with [`fetch`](Self::fetch) or
/// [`count`](Self::count). Records must round-trip through JSON so they can be cached.
pub trait EntityStore: Send + Sync {
    type Builder: QueryBuilder + Send;
    type Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Entity type name, used as the root of every cache key and tag.
    fn entity_type(&self) -> &str;

    fn primary_key(&self) -> &str {
        "id"
    }

    /// Primary key of `record`.
    fn record_id(&self, record: &Self::Record) -> Option<Scalar>;

    fn query(&self) -> Self::Builder;

    fn fetch(
        &self,
        query: Self::Builder,
    ) -> impl Future<Output = StoreResult<Vec<Self::Record>>> + Send;

    fn count(&self, query: Self::Builder) -> impl Future<Output = StoreResult<u64>> + Send;

    fn insert(
        &self,
        attributes: Attributes,
    ) -> impl Future<Output = StoreResult<Self::Record>> + Send;

    /// Applies `attributes` to the record `id`. Fails with [`StoreError::NotFound`]
    /// if it does not exist.
    fn update(
        &self,
        id: &Scalar,
        attributes: Attributes,
    ) -> impl Future<Output = StoreResult<Self::Record>> + Send;

    /// Returns whether a record was removed.
    fn delete(&self, id: &Scalar) -> impl Future<Output = StoreResult<bool>> + Send;
}
