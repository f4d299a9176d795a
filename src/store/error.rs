use thiserror::Error;

/// Errors raised by the underlying entity store.
///
/// Passed through to callers unchanged, and cloned to every caller coalesced onto
/// the failing read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
