use thiserror::Error;

#[derive(Debug, Error)]
pub enum DuoError {
    // ── Integrity errors ─────────────────────────────────────────────────────
    #[error("hash mismatch on block {block_hash} at index {index}")]
    HashMismatch { block_hash: String, index: usize },

    #[error("link mismatch at index {index}: expected prev_block_hash {expected}, got {got}")]
    LinkMismatch {
        index: usize,
        expected: String,
        got: String,
    },

    #[error("type mismatch: expected block_type {expected}, got {got} for block {block_hash}")]
    TypeMismatch {
        expected: u32,
        got: u32,
        block_hash: String,
    },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    // ── Cross-chain errors ───────────────────────────────────────────────────
    #[error("cross-chain mismatch between {chain} and {peer}: {reason}")]
    CrossChainMismatch {
        chain: String,
        peer: String,
        reason: String,
    },

    #[error("rebuild failed on block {block_hash} at index {index}: no progress made")]
    RebuildFailed { block_hash: String, index: usize },

    // ── Lookup / IO errors ───────────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DuoError {
    fn from(e: std::io::Error) -> Self {
        DuoError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for DuoError {
    fn from(e: serde_json::Error) -> Self {
        DuoError::IoError(e.to_string())
    }
}
