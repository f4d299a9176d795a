//! Query builder abstraction the criteria are applied to.

pub mod builder;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use builder::{Predicate, PredicateGroup, QueryBuilder};
#[cfg(any(test, feature = "mock"))]
pub use mock::{BuilderCall, RecordingBuilder};
