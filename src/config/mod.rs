//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `QUARRY_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::time::Duration;

use crate::cache::{CoordinatorConfig, MemoryStoreConfig};
use crate::constants::{
    CACHEABLE_METHODS, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_INVALIDATION_RETRIES, LIST_SEPARATOR,
};
use crate::dsl::types::parse_flag;
use crate::identity::DecodePolicy;
use crate::repository::RepositoryConfig;

/// Repository and cache configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `QUARRY_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Route reads through the result cache. Default: `true`.
    pub cache_enabled: bool,

    /// Lifetime of a cached result. Default: 30 minutes.
    pub cache_ttl: Duration,

    /// Max entries in the in-memory tag store. Default: `10_000`.
    pub cache_capacity: u64,

    /// Restart an entry's TTL on every hit. Default: `false`.
    pub refresh_on_hit: bool,

    /// Handling of id values the transcoder rejects. Default: `no_match`.
    pub decode_policy: DecodePolicy,

    /// Extra attempts after a failed invalidation. Default: `2`.
    pub invalidation_retries: u32,

    /// When non-empty, only these read methods are cached.
    pub cache_only: Vec<String>,

    /// Read methods that are never cached.
    pub cache_except: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            refresh_on_hit: false,
            decode_policy: DecodePolicy::default(),
            invalidation_retries: DEFAULT_INVALIDATION_RETRIES,
            cache_only: Vec::new(),
            cache_except: Vec::new(),
        }
    }
}

impl Config {
    const ENV_CACHE_ENABLED: &'static str = "QUARRY_CACHE_ENABLED";
    const ENV_CACHE_TTL_SECS: &'static str = "QUARRY_CACHE_TTL_SECS";
    const ENV_CACHE_CAPACITY: &'static str = "QUARRY_CACHE_CAPACITY";
    const ENV_REFRESH_ON_HIT: &'static str = "QUARRY_CACHE_REFRESH_ON_HIT";
    const ENV_DECODE_POLICY: &'static str = "QUARRY_DECODE_POLICY";
    const ENV_INVALIDATION_RETRIES: &'static str = "QUARRY_INVALIDATION_RETRIES";
    const ENV_CACHE_ONLY: &'static str = "QUARRY_CACHE_ONLY";
    const ENV_CACHE_EXCEPT: &'static str = "QUARRY_CACHE_EXCEPT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_enabled =
            Self::parse_flag_from_env(Self::ENV_CACHE_ENABLED, defaults.cache_enabled)?;
        let cache_ttl = Self::parse_u64_from_env(Self::ENV_CACHE_TTL_SECS, DEFAULT_CACHE_TTL_SECS)
            .map(Duration::from_secs)?;
        let cache_capacity =
            Self::parse_u64_from_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity)?;
        let refresh_on_hit =
            Self::parse_flag_from_env(Self::ENV_REFRESH_ON_HIT, defaults.refresh_on_hit)?;
        let decode_policy = Self::parse_policy_from_env(defaults.decode_policy)?;
        let invalidation_retries = Self::parse_u64_from_env(
            Self::ENV_INVALIDATION_RETRIES,
            u64::from(defaults.invalidation_retries),
        )?
        .min(u64::from(u32::MAX)) as u32;
        let cache_only = Self::parse_list_from_env(Self::ENV_CACHE_ONLY);
        let cache_except = Self::parse_list_from_env(Self::ENV_CACHE_EXCEPT);

        Ok(Self {
            cache_enabled,
            cache_ttl,
            cache_capacity,
            refresh_on_hit,
            decode_policy,
            invalidation_retries,
            cache_only,
            cache_except,
        })
    }

    /// Checks limits and the method lists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }

        for name in self.cache_only.iter().chain(&self.cache_except) {
            if !CACHEABLE_METHODS.contains(&name.as_str()) {
                return Err(ConfigError::UnknownMethod { name: name.clone() });
            }
        }
        if let Some(name) = self.cache_only.iter().find(|m| self.cache_except.contains(m)) {
            return Err(ConfigError::ConflictingMethod { name: name.clone() });
        }

        Ok(())
    }

    pub fn memory_store_config(&self) -> MemoryStoreConfig {
        MemoryStoreConfig::default()
            .with_capacity(self.cache_capacity)
            .with_refresh_on_hit(self.refresh_on_hit)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default().with_retries(self.invalidation_retries)
    }

    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig::default()
            .with_cache_enabled(self.cache_enabled)
            .with_ttl(self.cache_ttl)
            .with_decode_policy(self.decode_policy)
            .with_cache_only(self.cache_only.clone())
            .with_cache_except(self.cache_except.clone())
    }

    fn parse_flag_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(name) {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag { name, value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_policy_from_env(default: DecodePolicy) -> Result<DecodePolicy, ConfigError> {
        match env::var(Self::ENV_DECODE_POLICY) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidDecodePolicy { value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_list_from_env(name: &str) -> Vec<String> {
        env::var(name)
            .map(|v| {
                v.split(LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
