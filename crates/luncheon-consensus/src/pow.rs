// Consensus-critical. Changes require a protocol version bump + tests.
//! Proof-of-work hashing.
//!
//! Luncheon defines PoW over the block header hash computed by `luncheon-core`
//! (SHAKE-256 of the fixed header concatenation).
//!
//! The PoW condition is:
//!     header_hash_as_u256 <= unpack(packed_target)

use luncheon_core::{Block, Hash32};

use crate::error::ConsensusError;
use crate::target::{hash_meets_target, unpack_target};

/// Compute the canonical PoW hash for a block header.
pub fn pow_hash(block: &Block) -> Hash32 {
    block.compute_hash()
}

/// Validate proof-of-work for a solved block.
///
/// The stored `block_hash` must equal the recomputed header hash and that
/// hash must not exceed the block's own target.
pub fn validate_pow(block: &Block) -> Result<(), ConsensusError> {
    let h = pow_hash(block);
    if h != block.block_hash {
        return Err(ConsensusError::HashMismatch);
    }
    if !hash_meets_target(&h, &unpack_target(block.packed_target)) {
        return Err(ConsensusError::InsufficientPoW);
    }
    Ok(())
}
