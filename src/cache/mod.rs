//! Tag-aware result cache with single-flight coordination.

pub mod config;
pub mod coordinator;
pub mod error;
mod flight;
pub mod index;
pub mod memory;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod store;
pub mod types;


pub use config::{CoordinatorConfig, MemoryStoreConfig};
pub use coordinator::CacheCoordinator;
pub use error::{CacheError, CacheResult, CacheStoreError, CacheStoreResult};
pub use index::TagIndex;
pub use memory::MemoryTagStore;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTagStore;
pub use store::TagCacheStore;
pub use types::{CacheEntry, CacheStats};
