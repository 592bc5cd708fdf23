#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Luncheon consensus rules for PoW blocks.
//!
//! This crate is responsible for:
//! - compact difficulty target encoding/decoding
//! - proof-of-work validation against the target
//! - the halving reward schedule and retarget arithmetic
//! - the cancellable proof-of-work search
//!
//! It intentionally does **not** touch chain state; the ledger and the
//! validator live in `luncheon-state`.

pub mod error;
pub mod miner;
pub mod pow;
pub mod retarget;
pub mod reward;
pub mod target;

pub use error::*;
pub use miner::*;
pub use pow::*;
pub use retarget::*;
pub use reward::*;
pub use target::*;
