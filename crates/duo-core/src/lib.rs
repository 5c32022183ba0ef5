pub mod block;
pub mod error;
pub mod hash;
pub mod types;

pub use block::{Block, BlockHeader, BlockKind, BlockPayload};
pub use error::DuoError;
pub use hash::{sha256_concat, seed_hash};
pub use types::{Amount, BlockHash, ChainId, Timestamp};
