// Consensus-critical. Changes require a protocol version bump + tests.
//! Difficulty target utilities.
//!
//! Luncheon uses a "compact" encoding in `Block.packed_target`. This encodes
//! a 256-bit target as: `packed = (exponent << 24) | mantissa` where the
//! mantissa is 3 bytes and the exponent is the byte length of the target:
//!
//! - exponent = packed >> 24
//! - mantissa = packed & 0x00ffffff
//!
//! Then: target = mantissa * 2^(8*(exponent-3)), shifting right when the
//! exponent is below 3.
//!
//! Conversions are exact integer arithmetic, no floats.

use luncheon_core::Hash32;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::ConsensusError;

/// Widest target the compact encoding carries.
pub const MAX_TARGET_BITS: u64 = 256;

/// Decode a compact target to its full value.
///
/// Every input decodes; non-canonical encodings (a mantissa with leading
/// zero bytes, or the top bit set) are accepted but need not re-pack to the
/// same compact value.
pub fn unpack_target(packed: u32) -> BigUint {
    let exponent = (packed >> 24) as usize;
    let mantissa = BigUint::from(packed & 0x00ff_ffff);

    if exponent <= 3 {
        mantissa >> (8 * (3 - exponent))
    } else {
        mantissa << (8 * (exponent - 3))
    }
}

/// Encode a target into compact form.
///
/// The exponent is the minimal byte length of the target and the mantissa
/// its three most significant bytes. When the mantissa's top bit would be
/// set it is shifted down a byte and the exponent bumped, keeping the
/// encoding unambiguous. Zero encodes as `0`.
pub fn pack_target(target: &BigUint) -> Result<u32, ConsensusError> {
    if target.is_zero() {
        return Ok(0);
    }
    if target.bits() > MAX_TARGET_BITS {
        return Err(ConsensusError::TargetOverflow);
    }

    // Big-endian bytes without leading zeros; exponent is the byte count.
    let bytes = target.to_bytes_be();
    let mut exponent = bytes.len() as u32;

    let mut mantissa = bytes
        .iter()
        .take(3)
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
    if bytes.len() < 3 {
        mantissa <<= 8 * (3 - bytes.len() as u32);
    }

    if (mantissa & 0x0080_0000) != 0 {
        mantissa >>= 8;
        exponent += 1;
    }

    Ok((exponent << 24) | mantissa)
}

/// Returns `true` if `hash`, read as a big-endian integer, is `<= target`.
pub fn hash_meets_target(hash: &Hash32, target: &BigUint) -> bool {
    BigUint::from_bytes_be(hash.as_bytes()) <= *target
}

/// How many times harder `target` is than `max_target`, truncated to the
/// low 64 bits of the quotient. A zero target reports `u64::MAX`.
pub fn difficulty_ratio(max_target: &BigUint, target: &BigUint) -> u64 {
    if target.is_zero() {
        return u64::MAX;
    }
    (max_target / target).iter_u64_digits().next().unwrap_or(0)
}
