//! Chain parameters.
//!
//! Every consensus value a test may want to scale down is carried here and
//! passed explicitly into the ledger, validator and miner.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::CoreError;

/// Consensus parameters of a Luncheon chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Software version written into produced blocks and compared when
    /// version matching is requested.
    pub software_version: String,
    /// Compact form of the easiest (maximum) target; the genesis target.
    pub max_packed_target: u32,
    /// Largest compact target the miner will search against.
    pub miner_target_ceiling: u32,
    /// Blocks between difficulty retargets.
    pub retarget_interval: u64,
    /// Desired seconds between blocks.
    pub target_block_time_secs: u64,
    /// Blocks between reward halvings.
    pub halving_interval: u64,
    /// Blocks that must be stacked on a block before its reward matures.
    pub maturity_depth: u64,
    /// Public key (hex) credited with the genesis reward.
    pub genesis_miner: String,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            software_version: DEFAULT_SOFTWARE_VERSION.to_owned(),
            max_packed_target: GENESIS_PACKED_TARGET,
            miner_target_ceiling: MINER_TARGET_CEILING,
            retarget_interval: RETARGET_INTERVAL_BLOCKS,
            target_block_time_secs: BLOCK_TIME_SECS,
            halving_interval: HALVING_INTERVAL_BLOCKS,
            maturity_depth: REWARD_MATURITY_BLOCKS,
            genesis_miner: String::new(),
        }
    }
}

impl ChainParams {
    /// Scaled-down parameters for local chains and tests.
    ///
    /// The maximum target accepts roughly every second hash, so blocks can be
    /// mined in a handful of attempts.
    pub fn regtest() -> Self {
        Self {
            max_packed_target: 0x207f_ffff,
            miner_target_ceiling: 0x207f_ffff,
            retarget_interval: 5,
            halving_interval: 20,
            maturity_depth: 2,
            ..Self::default()
        }
    }

    /// Builder-style setter for the genesis reward recipient.
    pub fn with_genesis_miner(mut self, miner: impl Into<String>) -> Self {
        self.genesis_miner = miner.into();
        self
    }

    /// Reject parameter sets the consensus arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.software_version.is_empty() {
            return Err(CoreError::InvalidValue("software_version must be non-empty"));
        }
        if self.max_packed_target == 0 {
            return Err(CoreError::InvalidValue("max_packed_target must be non-zero"));
        }
        if self.max_packed_target > self.miner_target_ceiling {
            return Err(CoreError::InvalidValue(
                "max_packed_target exceeds miner_target_ceiling",
            ));
        }
        if self.retarget_interval == 0 {
            return Err(CoreError::InvalidValue("retarget_interval must be non-zero"));
        }
        if self.target_block_time_secs == 0 {
            return Err(CoreError::InvalidValue(
                "target_block_time_secs must be non-zero",
            ));
        }
        if self.halving_interval == 0 {
            return Err(CoreError::InvalidValue("halving_interval must be non-zero"));
        }
        Ok(())
    }
}
