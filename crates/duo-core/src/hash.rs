use sha2::{Digest, Sha256};

use crate::types::{Amount, BlockHash};

/// `sha256_hex(concat(utf8(s_i)))` — the one hashing primitive every block
/// variant and every attestation sub-chain reduces to.
pub fn sha256_concat<I, S>(parts: I) -> BlockHash
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
    }
    BlockHash(hex::encode(hasher.finalize()))
}

/// `sha256_hex(seed)` — the chain's synthetic origin hash.
pub fn seed_hash(seed: &str) -> BlockHash {
    sha256_concat([seed])
}

pub fn dec_str(d: Amount) -> String {
    d.to_string()
}

pub fn opt_dec_str(d: Option<Amount>) -> String {
    match d {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

pub fn bool_str(b: bool) -> String {
    if b {
        "True".to_string()
    } else {
        "False".to_string()
    }
}

pub fn opt_str(s: &Option<String>) -> String {
    match s {
        Some(v) => v.clone(),
        None => "None".to_string(),
    }
}

/// A positive, present amount — mirrors the Python `is_amount()` guard used
/// to decide whether an optional `amount` enters a block's hash (backward
/// compatibility with chains predating the `amount` field).
pub fn is_amount(d: Option<Amount>) -> bool {
    matches!(d, Some(v) if !v.is_zero() && v.is_sign_positive())
}
