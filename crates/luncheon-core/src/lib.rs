#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Luncheon core: canonical types, chain parameters, hashing, and the
//! signing/time interfaces the consensus layers depend on.

pub mod clock;
pub mod constants;
pub mod crypto;
pub mod params;
pub mod serialization;
pub mod types;

pub use clock::*;
pub use constants::*;
pub use crypto::*;
pub use params::*;
pub use serialization::*;
pub use types::*;
