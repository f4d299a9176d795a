use thiserror::Error;

use crate::dsl::ParseError;
use crate::identity::DecodeError;
use crate::store::StoreError;

/// Errors surfaced by [`Repository`](super::Repository) calls.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Malformed request parameters.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A write addressed an id the transcoder rejected.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The underlying store failed; never retried here.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Arguments or criteria could not be encoded into a cache key.
    #[error("failed to derive cache key: {0}")]
    Key(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
