pub mod chain;
pub mod persistence;
pub mod store;

pub use chain::{
    hash_verification_subchain, AttrQuery, Chain, ChainStats, PeerCredibility, ValueType,
    VerificationSubChain,
};
pub use store::ChainStore;
