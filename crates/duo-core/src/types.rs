use std::fmt;

use serde::{Deserialize, Serialize};

/// Arbitrary-precision decimal used for every monetary quantity. Never a
/// binary float: scale is preserved exactly as constructed or parsed, which
/// is what canonical hashing and wire round-tripping both depend on.
pub type Amount = rust_decimal::Decimal;

/// Milliseconds since the Unix epoch. Not required to be monotonic across a
/// chain — actor clocks may skew backwards between appends.
pub type Timestamp = i64;

// ── ChainId ──────────────────────────────────────────────────────────────────

/// A chain's stable identifier. Textual UUID by convention, but treated as an
/// opaque string everywhere it is compared (peers reference each other only
/// by this value).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── BlockHash ────────────────────────────────────────────────────────────────

/// A block's canonical hash: lowercase hex-encoded SHA-256, 64 characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl BlockHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}…)", &self.0[..self.0.len().min(8)])
    }
}

impl From<String> for BlockHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}
