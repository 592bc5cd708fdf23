//! Protocol-wide constants for Luncheon.
//!
//! Values that tests need to scale down live in [`crate::ChainParams`]
//! instead; what remains here is fixed by the wire format or the emission
//! schedule.

/// Length in bytes of a 32-byte hash.
pub const HASH32_LEN: usize = 32;

/// Default software version string carried in block headers.
pub const DEFAULT_SOFTWARE_VERSION: &str = "Luncheon 1.0";

/// Number of LUNCHEON units per one LNCH.
pub const UNITS_PER_COIN: u64 = 1_000_000;

/// Block reward before the first halving, in whole coins.
pub const INITIAL_REWARD_COINS: u64 = 200;

/// Compact target of the genesis block (easiest allowed target).
pub const GENESIS_PACKED_TARGET: u32 = 0x1d0f_ffff;

/// Largest compact target the miner accepts.
pub const MINER_TARGET_CEILING: u32 = 0x1dff_ffff;

/// Blocks between difficulty retargets (one week at one block per minute).
pub const RETARGET_INTERVAL_BLOCKS: u64 = 10_080;

/// Block time target in seconds.
pub const BLOCK_TIME_SECS: u64 = 60;

/// Blocks between reward halvings (one year at one block per minute).
pub const HALVING_INTERVAL_BLOCKS: u64 = 525_600;

/// Confirmations required on top of a block before its reward is spendable.
pub const REWARD_MATURITY_BLOCKS: u64 = 10;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREV_HASH: [u8; HASH32_LEN] = [0u8; HASH32_LEN];

/// Timestamp of the genesis block.
pub const GENESIS_TIMESTAMP: u64 = 0;

/// Weight reserved for the signature when pricing an unsigned transaction.
pub const SIGNATURE_WEIGHT_ALLOWANCE: u64 = 64;

/// Fee charged per unit of transaction weight, in LUNCHEON units.
pub const FEE_PER_WEIGHT: u64 = 100;

/// Fixed weight of a transaction: two u64 fields (value, fee) and the u32 nonce.
pub const TX_FIXED_WEIGHT: u64 = 8 * 2 + 4;
