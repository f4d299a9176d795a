use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_PER_PAGE};
use crate::identity::DecodePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-repository read and cache behaviour.
pub struct RepositoryConfig {
    /// Route reads through the cache coordinator.
    pub cache_enabled: bool,
    /// TTL given to every cached read.
    pub ttl: Duration,
    /// Handling of id values the transcoder rejects.
    pub decode_policy: DecodePolicy,
    /// When non-empty, only these read methods are cached.
    pub cache_only: Vec<String>,
    /// Read methods that are never cached.
    pub cache_except: Vec<String>,
    /// Page size used when `paginate` is given none.
    pub per_page: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            decode_policy: DecodePolicy::default(),
            cache_only: Vec::new(),
            cache_except: Vec::new(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl RepositoryConfig {
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_cache_only(mut self, methods: Vec<String>) -> Self {
        self.cache_only = methods;
        self
    }

    pub fn with_cache_except(mut self, methods: Vec<String>) -> Self {
        self.cache_except = methods;
        self
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self
    }

    /// Whether reads through `method` are cached.
    pub fn caches(&self, method: &str) -> bool {
        let listed = |list: &[String]| list.iter().any(|m| m == method);
        self.cache_enabled
            && (self.cache_only.is_empty() || listed(&self.cache_only))
            && !listed(&self.cache_except)
    }
}
