//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A boolean variable was not one of `true|false|1|0`.
    #[error("invalid boolean {name}='{value}': expected true, false, 1 or 0")]
    InvalidFlag { name: &'static str, value: String },

    /// Unrecognised id decode policy.
    #[error("invalid decode policy '{value}': expected no_match or literal")]
    InvalidDecodePolicy { value: String },

    /// Cache capacity must allow at least one entry.
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,

    /// Entries with a zero TTL would never be served.
    #[error("cache TTL must be greater than zero")]
    ZeroTtl,

    /// A method list names something that is not a cacheable read.
    #[error("unknown cacheable method '{name}'")]
    UnknownMethod { name: String },

    /// The same method is both whitelisted and blacklisted.
    #[error("method '{name}' is listed in both cache_only and cache_except")]
    ConflictingMethod { name: String },
}
