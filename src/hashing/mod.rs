//! Deterministic cache key derivation.
//!
//! A key is `"{entity}:{operation}:{args}:{criteria}"` where the last two segments
//! are hex digests of the canonical JSON encoding of the ordered arguments and the
//! ordered applied criteria. BLAKE3 is seedless, so keys are stable across runs.

use std::fmt;

use blake3::Hasher;
use serde::Serialize;

use crate::constants::{KEY_DIGEST_BYTES, TAG_SEPARATOR};
use crate::criteria::Criterion;

/// Identity of one cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    entity_type: String,
    key: String,
}

impl CacheKey {
    /// Wraps an already-derived key string.
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    #[inline]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Derives the key for `operation` on `entity_type` with `args` under `criteria`.
///
/// Both sequences are hashed in order, so pushing the same criteria in a different
/// order yields a different key.
pub fn derive_key(
    entity_type: &str,
    operation: &str,
    args: &[serde_json::Value],
    criteria: &[Criterion],
) -> serde_json::Result<CacheKey> {
    let args_hex = digest_hex(args)?;
    let criteria_hex = digest_hex(criteria)?;
    let key = [
        entity_type,
        operation,
        args_hex.as_str(),
        criteria_hex.as_str(),
    ]
    .join(TAG_SEPARATOR);
    Ok(CacheKey::new(entity_type, key))
}

/// Hex of the truncated BLAKE3 digest of `value`'s JSON encoding.
pub fn digest_hex<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut hasher = Hasher::new();
    serde_json::to_writer(&mut hasher, value)?;
    let hash = hasher.finalize();
    Ok(hash.to_hex()[..KEY_DIGEST_BYTES * 2].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{SortDirection, SortKey};
    use serde_json::json;
    use std::collections::HashSet;

    fn crit(field: &str) -> Criterion {
        Criterion::where_eq(field, "x")
    }

    #[test]
    fn test_derive_key_determinism() {
        let criteria = [crit("a"), crit("b")];

        let k1 = derive_key("user", "all", &[json!(1)], &criteria).expect("key");
        let k2 = derive_key("user", "all", &[json!(1)], &criteria).expect("key");

        assert_eq!(k1, k2);
        assert_eq!(k1.entity_type(), "user");
        assert!(k1.as_str().starts_with("user:all:"));
    }

    #[test]
    fn test_derive_key_is_stable_across_runs() {
        let k = derive_key("user", "find", &[json!(42)], &[]).expect("key");
        let args_hex = digest_hex(&[json!(42)][..]).expect("digest");
        let empty: &[Criterion] = &[];
        let crit_hex = digest_hex(empty).expect("digest");

        assert_eq!(k.as_str(), format!("user:find:{args_hex}:{crit_hex}"));
        // "[]" is always the empty criteria encoding.
        assert_eq!(crit_hex, blake3::hash(b"[]").to_hex()[..32].to_string());
    }

    #[test]
    fn test_derive_key_order_sensitivity() {
        let forward = derive_key("user", "all", &[], &[crit("a"), crit("b")]).expect("key");
        let backward = derive_key("user", "all", &[], &[crit("b"), crit("a")]).expect("key");
        assert_ne!(forward, backward);

        let args_fwd = derive_key("user", "page", &[json!(1), json!(2)], &[]).expect("key");
        let args_bwd = derive_key("user", "page", &[json!(2), json!(1)], &[]).expect("key");
        assert_ne!(args_fwd, args_bwd);
    }

    #[test]
    fn test_derive_key_component_sensitivity() {
        let base = derive_key("user", "all", &[json!(1)], &[crit("a")]).expect("key");

        let keys = [
            derive_key("post", "all", &[json!(1)], &[crit("a")]).expect("key"),
            derive_key("user", "first", &[json!(1)], &[crit("a")]).expect("key"),
            derive_key("user", "all", &[json!("1")], &[crit("a")]).expect("key"),
            derive_key("user", "all", &[json!(1)], &[crit("b")]).expect("key"),
            derive_key(
                "user",
                "all",
                &[json!(1)],
                &[Criterion::OrderBy(SortKey::new("a", SortDirection::Asc))],
            )
            .expect("key"),
        ];

        let unique: HashSet<_> = keys.iter().chain(std::iter::once(&base)).collect();
        assert_eq!(unique.len(), keys.len() + 1);
    }

    #[test]
    fn test_digest_length() {
        let hex = digest_hex("anything").expect("digest");
        assert_eq!(hex.len(), KEY_DIGEST_BYTES * 2);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
