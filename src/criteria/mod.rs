//! Criteria and the pipeline that applies them to a query builder.

pub mod criterion;
pub mod pipeline;
pub mod resolve;


pub use criterion::Criterion;
pub use pipeline::CriteriaPipeline;
pub use resolve::CriteriaResolver;
