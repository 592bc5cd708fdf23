//! The ledger: an ordered list of blocks with genesis at index 0.
//!
//! Height is `len - 1` and is always derived from the block list. The
//! account projection is updated on every append and pop.

use luncheon_consensus::{
    block_reward, difficulty_ratio, is_retarget_height, retarget, unpack_target,
};
use luncheon_core::{Block, BlockHash, ChainParams, Transaction, GENESIS_PREV_HASH, GENESIS_TIMESTAMP};
use tracing::{debug, info};

use crate::accounts::{Account, AccountState};
use crate::error::StateError;
use crate::validate::{BlockOutcome, Validator};

/// Linear chain of blocks plus its derived account projection.
#[derive(Clone, Debug)]
pub struct Ledger {
    params: ChainParams,
    blocks: Vec<Block>,
    accounts: AccountState,
}

impl Ledger {
    /// New ledger holding only the genesis block.
    pub fn init(params: ChainParams) -> Self {
        let genesis = genesis_block(&params);
        info!(hash = %genesis.block_hash, "genesis block created");
        Self::from_blocks(params, vec![genesis])
    }

    /// Ledger over existing `blocks` (possibly empty), rebuilding the
    /// account projection.
    pub fn from_blocks(params: ChainParams, blocks: Vec<Block>) -> Self {
        let accounts = AccountState::rescan(&blocks, &params);
        Self {
            params,
            blocks,
            accounts,
        }
    }

    /// Chain parameters.
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Reward paid to the miner of the block at `height`.
    pub fn get_block_reward(&self, height: u64) -> u64 {
        block_reward(height, self.params.halving_interval)
    }

    /// Append `block` without validating it.
    pub fn add_block(&mut self, block: Block) {
        debug!(
            height = self.blocks.len(),
            hash = %block.block_hash,
            txs = block.transactions.len(),
            "block appended"
        );
        self.blocks.push(block);
        self.accounts.push_block(&self.blocks, &self.params);
    }

    /// Pop the tip, if any.
    pub fn remove_block(&mut self) -> Option<Block> {
        let removed = self.blocks.pop()?;
        self.accounts.pop_block(&self.blocks, &removed, &self.params);
        debug!(hash = %removed.block_hash, "tip removed");
        Some(removed)
    }

    /// Index of the tip; `None` for an empty ledger.
    pub fn height(&self) -> Option<u64> {
        (self.blocks.len() as u64).checked_sub(1)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the ledger has no blocks, not even genesis.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Latest block.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Block at index `n`.
    pub fn block(&self, n: u64) -> Option<&Block> {
        usize::try_from(n).ok().and_then(|n| self.blocks.get(n))
    }

    /// All blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Compact target required for the block that will sit at
    /// `block_number`.
    ///
    /// Returns `0` when `block_number` is past the next free slot. Outside
    /// retarget boundaries the previous block's target carries over.
    pub fn calculate_packed_target(&self, block_number: u64) -> u32 {
        if block_number > self.blocks.len() as u64 {
            return 0;
        }
        if block_number == 0 {
            return self.params.max_packed_target;
        }

        let n = block_number as usize;
        let prev = &self.blocks[n - 1];
        if !is_retarget_height(block_number, &self.params) {
            return prev.packed_target;
        }

        let interval = self.params.retarget_interval as usize;
        let first = &self.blocks[n - interval];
        let elapsed = prev.timestamp.saturating_sub(first.timestamp);
        retarget(prev.packed_target, elapsed, &self.params)
    }

    /// Difficulty of the tip relative to the maximum target.
    pub fn difficulty(&self) -> u64 {
        self.height()
            .and_then(|h| self.difficulty_of_block(h))
            .unwrap_or(1)
    }

    /// Difficulty of block `n` relative to the maximum target.
    pub fn difficulty_of_block(&self, n: u64) -> Option<u64> {
        let block = self.block(n)?;
        let max = unpack_target(self.params.max_packed_target);
        Some(difficulty_ratio(&max, &unpack_target(block.packed_target)))
    }

    /// Derived view of `key`.
    pub fn account(&self, key: &str) -> Account {
        self.accounts.account(key)
    }

    /// The whole account projection.
    pub fn accounts(&self) -> &AccountState {
        &self.accounts
    }

    /// Unsolved block extending the tip, carrying the required target.
    pub fn candidate(
        &self,
        miner: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Block, StateError> {
        let prev_hash: BlockHash = self
            .tip()
            .map(|b| b.block_hash)
            .unwrap_or(BlockHash::from(GENESIS_PREV_HASH));
        let packed_target = self.calculate_packed_target(self.blocks.len() as u64);
        Ok(Block::candidate(
            self.params.software_version.clone(),
            prev_hash,
            packed_target,
            miner,
            transactions,
        )?)
    }

    /// Validate `block` against the tip and append it if every part of it
    /// is acceptable.
    ///
    /// Blocks with rejected transactions are left out; their outcome is
    /// returned inside the error.
    pub fn submit_block(
        &mut self,
        validator: &Validator,
        block: Block,
        require_version_match: bool,
    ) -> Result<BlockOutcome, StateError> {
        let outcome = validator.validate_block(self, &block, require_version_match)?;
        if !outcome.rejected.is_empty() {
            return Err(StateError::TransactionsRejected {
                rejected: outcome.rejected,
            });
        }
        info!(
            height = self.blocks.len(),
            hash = %block.block_hash,
            txs = block.transactions.len(),
            "block accepted"
        );
        self.add_block(block);
        Ok(outcome)
    }
}

/// The genesis block for `params`: no transactions, maximum target, zero
/// timestamp and a computed hash.
pub fn genesis_block(params: &ChainParams) -> Block {
    let mut block = Block {
        software_version: params.software_version.clone(),
        prev_hash: BlockHash::from(GENESIS_PREV_HASH),
        merkle_root: BlockHash::zero(),
        timestamp: GENESIS_TIMESTAMP,
        packed_target: params.max_packed_target,
        nonce: 0,
        miner: params.genesis_miner.clone(),
        transactions: Vec::new(),
        block_hash: BlockHash::zero(),
    };
    block.block_hash = block.compute_hash();
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::init(ChainParams::regtest())
    }

    fn push_at(ledger: &mut Ledger, timestamp: u64) {
        let mut b = ledger.candidate("aa", vec![]).unwrap();
        b.timestamp = timestamp;
        b.block_hash = b.compute_hash();
        ledger.add_block(b);
    }

    #[test]
    fn genesis_shape() {
        let l = ledger();
        let g = l.tip().unwrap();
        assert_eq!(l.height(), Some(0));
        assert_eq!(g.prev_hash, BlockHash::zero());
        assert_eq!(g.timestamp, 0);
        assert_eq!(g.packed_target, l.params().max_packed_target);
        assert!(g.transactions.is_empty());
        assert_eq!(g.block_hash, g.compute_hash());
    }

    #[test]
    fn height_tracks_mutation() {
        let mut l = ledger();
        push_at(&mut l, 10);
        push_at(&mut l, 20);
        assert_eq!(l.height(), Some(2));
        assert_eq!(l.remove_block().unwrap().timestamp, 20);
        assert_eq!(l.height(), Some(1));
        l.remove_block();
        l.remove_block();
        assert_eq!(l.height(), None);
        assert!(l.remove_block().is_none());
    }

    #[test]
    fn target_out_of_range_and_carry_over() {
        let mut l = ledger();
        assert_eq!(l.calculate_packed_target(0), 0x207f_ffff);
        assert_eq!(l.calculate_packed_target(2), 0);
        push_at(&mut l, 60);
        assert_eq!(l.calculate_packed_target(2), l.blocks()[1].packed_target);
    }

    #[test]
    fn candidate_links_to_tip() {
        let l = ledger();
        let c = l.candidate("aa", vec![]).unwrap();
        assert_eq!(c.prev_hash, l.tip().unwrap().block_hash);
        assert_eq!(c.packed_target, l.calculate_packed_target(1));
        assert_eq!(c.software_version, l.params().software_version);

        let empty = Ledger::from_blocks(ChainParams::regtest(), vec![]);
        let c = empty.candidate("aa", vec![]).unwrap();
        assert_eq!(c.prev_hash, BlockHash::zero());
        assert_eq!(c.packed_target, 0x207f_ffff);
    }

    #[test]
    fn difficulty_at_max_is_one() {
        let l = ledger();
        assert_eq!(l.difficulty(), 1);
        assert_eq!(l.difficulty_of_block(5), None);
    }

    #[test]
    fn reward_delegates_to_schedule() {
        let l = ledger();
        assert_eq!(l.get_block_reward(0), 200_000_000);
        assert_eq!(l.get_block_reward(20), 100_000_000);
        assert_eq!(l.get_block_reward(160), 0);
    }
}
