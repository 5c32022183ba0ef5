//! The HTTP adapter: a pure boundary over `duo-core`/`duo-chain`/`duo-protocol`.
//! Not part of the ledger's core semantics — a REST surface that could be
//! swapped for another transport without touching a single chain invariant.

pub mod dto;
pub mod error;
pub mod events;
pub mod handlers_block;
pub mod handlers_chain;
pub mod router;
pub mod state;

pub use error::{AppError, AppResult};
pub use router::build_router;
pub use state::RpcState;
