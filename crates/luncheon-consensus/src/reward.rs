// Consensus-critical. Changes require a protocol version bump + tests.
//! Block reward schedule.
//!
//! The reward starts at 200 coins and halves every `halving_interval`
//! blocks. Halving happens on whole coins with integer division before the
//! conversion to LUNCHEON units, so the reward reaches zero at the 8th
//! halving (200 / 2^8 == 0).

use luncheon_core::{INITIAL_REWARD_COINS, UNITS_PER_COIN};

/// Reward, in LUNCHEON units, for the block at `height`.
///
/// A zero `halving_interval` disables halving.
pub fn block_reward(height: u64, halving_interval: u64) -> u64 {
    let halvings = height.checked_div(halving_interval).unwrap_or(0);
    if halvings == 0 {
        return INITIAL_REWARD_COINS * UNITS_PER_COIN;
    }

    // INITIAL_REWARD_COINS / 2^halvings (zero once the shift passes 63).
    let coins = u32::try_from(halvings)
        .ok()
        .and_then(|h| INITIAL_REWARD_COINS.checked_shr(h))
        .unwrap_or(0);
    coins * UNITS_PER_COIN
}

/// First height at which the reward is zero.
pub fn reward_exhaustion_height(halving_interval: u64) -> u64 {
    let halvings = u64::from(u64::BITS - INITIAL_REWARD_COINS.leading_zeros());
    halvings.saturating_mul(halving_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use luncheon_core::HALVING_INTERVAL_BLOCKS as H;

    #[test]
    fn schedule_boundaries() {
        assert_eq!(block_reward(0, H), 200_000_000);
        assert_eq!(block_reward(H - 1, H), 200_000_000);
        assert_eq!(block_reward(H, H), 100_000_000);
        assert_eq!(block_reward(2 * H, H), 50_000_000);
        assert_eq!(block_reward(3 * H, H), 25_000_000);
    }

    #[test]
    fn halving_truncates_whole_coins() {
        // 200 / 16 == 12 coins, not 12.5.
        assert_eq!(block_reward(4 * H, H), 12_000_000);
        assert_eq!(block_reward(7 * H, H), 1_000_000);
        assert_eq!(block_reward(8 * H - 1, H), 1_000_000);
    }

    #[test]
    fn reward_is_zero_from_eighth_halving() {
        assert_eq!(block_reward(8 * H, H), 0);
        assert_eq!(block_reward(64 * H, H), 0);
        assert_eq!(block_reward(u64::MAX, H), 0);
        assert_eq!(reward_exhaustion_height(H), 8 * H);
    }

    #[test]
    fn zero_interval_never_halves() {
        assert_eq!(block_reward(1_000_000_000, 0), 200_000_000);
    }
}
