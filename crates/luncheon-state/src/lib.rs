#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Luncheon ledger state.
//!
//! Responsibilities:
//! - Hold the linear chain of blocks and compute the target each new block
//!   must carry
//! - Keep the account projection (balance, nonce) in step with the chain
//! - Validate blocks, transactions and whole chains
//! - Save and load ledgers as JSON documents

pub mod accounts;
pub mod chain;
pub mod error;
pub mod store;
pub mod validate;

pub use accounts::*;
pub use chain::*;
pub use error::*;
pub use store::*;
pub use validate::*;
