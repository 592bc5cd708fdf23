// Consensus-critical. Changes require a protocol version bump + tests.
//! Periodic difficulty retarget.
//!
//! Every `retarget_interval` blocks the previous target is multiplied by
//! `(retarget_interval * target_block_time) / elapsed`, using integer
//! division on seconds, and clamped to the maximum target. Blocks arriving
//! faster than planned therefore make the target larger; the chain only ever
//! moves between its current target and the maximum.

use luncheon_core::ChainParams;
use num_bigint::BigUint;
use tracing::debug;

use crate::target::{pack_target, unpack_target};

/// Whether `block_number` starts a new retarget period.
pub fn is_retarget_height(block_number: u64, params: &ChainParams) -> bool {
    block_number > 0
        && block_number
            .checked_rem(params.retarget_interval)
            .is_some_and(|r| r == 0)
}

/// Integer multiplier applied at a retarget boundary.
///
/// An elapsed time of zero counts as one second and the multiplier is
/// floored at one, so a slow period leaves the target unchanged instead of
/// collapsing it to zero.
pub fn retarget_multiplier(elapsed_secs: u64, params: &ChainParams) -> u64 {
    let expected = params
        .retarget_interval
        .saturating_mul(params.target_block_time_secs);
    (expected / elapsed_secs.max(1)).max(1)
}

/// Compact target that follows `prev_packed` after a period of `elapsed_secs`.
pub fn retarget(prev_packed: u32, elapsed_secs: u64, params: &ChainParams) -> u32 {
    let multiplier = retarget_multiplier(elapsed_secs, params);
    let next = unpack_target(prev_packed) * BigUint::from(multiplier);
    let max = unpack_target(params.max_packed_target);

    let packed = if next > max {
        params.max_packed_target
    } else {
        pack_target(&next).unwrap_or(params.max_packed_target)
    };

    debug!(
        prev = format_args!("0x{prev_packed:08x}"),
        next = format_args!("0x{packed:08x}"),
        elapsed_secs,
        multiplier,
        "difficulty retarget"
    );
    packed
}
