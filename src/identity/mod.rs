//! Opaque identifier transcoding.
//!
//! Public ids may be encoded tokens standing in for internal numeric ids. The
//! transcoder is a pure function pair; the repository only calls it for values
//! flagged as possibly encoded by the parser.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Encodes internal numeric ids to public tokens and back.
pub trait IdTranscoder: Send + Sync {
    /// Returns `None` when `token` is not a valid encoded id.
    fn decode(&self, token: &str) -> Option<i64>;

    fn encode(&self, id: i64) -> String;
}

/// Identity transcoder: ids are their own decimal representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericTranscoder;

impl IdTranscoder for NumericTranscoder {
    #[inline]
    fn decode(&self, token: &str) -> Option<i64> {
        token.trim().parse().ok()
    }

    #[inline]
    fn encode(&self, id: i64) -> String {
        id.to_string()
    }
}

/// What to do with a value that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodePolicy {
    /// The predicate becomes unsatisfiable and matches nothing.
    #[default]
    NoMatch,
    /// Keep the raw token: as an integer when numeric, otherwise as text.
    Literal,
}

impl DecodePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodePolicy::NoMatch => "no_match",
            DecodePolicy::Literal => "literal",
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "no_match" | "nomatch" | "empty" => Ok(Self::NoMatch),
            "literal" | "raw" => Ok(Self::Literal),
            _ => Err(format!("Unknown decode policy: {}", s)),
        }
    }
}

/// A flagged id value that the transcoder rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not decode '{token}' for field '{field}'")]
pub struct DecodeError {
    pub field: String,
    pub token: String,
}

/// Test transcoder: ids are written as `"{prefix}{id}"`.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone)]
pub struct PrefixTranscoder {
    prefix: String,
}

#[cfg(any(test, feature = "mock"))]
impl PrefixTranscoder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
impl IdTranscoder for PrefixTranscoder {
    fn decode(&self, token: &str) -> Option<i64> {
        token.strip_prefix(&self.prefix)?.parse().ok()
    }

    fn encode(&self, id: i64) -> String {
        format!("{}{}", self.prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_transcoder() {
        let t = NumericTranscoder;
        assert_eq!(t.decode("42"), Some(42));
        assert_eq!(t.decode(" 7 "), Some(7));
        assert_eq!(t.decode("abc"), None);
        assert_eq!(t.encode(42), "42");
    }

    #[test]
    fn test_prefix_transcoder_round_trip() {
        let t = PrefixTranscoder::new("usr_");
        assert_eq!(t.encode(42), "usr_42");
        assert_eq!(t.decode("usr_42"), Some(42));
        assert_eq!(t.decode("42"), None);
        assert_eq!(t.decode("usr_x"), None);
    }

    #[test]
    fn test_decode_policy_from_str() {
        assert_eq!("no-match".parse::<DecodePolicy>(), Ok(DecodePolicy::NoMatch));
        assert_eq!("LITERAL".parse::<DecodePolicy>(), Ok(DecodePolicy::Literal));
        assert!("sometimes".parse::<DecodePolicy>().is_err());
        assert_eq!(DecodePolicy::default(), DecodePolicy::NoMatch);
    }
}
