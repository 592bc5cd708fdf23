//! Account projection.
//!
//! Balances and nonces are not stored on chain; they follow from history:
//!
//! - balance = values received + matured block rewards
//! - nonce = number of transactions the account has sent
//!
//! A block reward at index `i` is matured at height `h` once
//! `i + maturity_depth < h`. Sending does not lower the balance; the nonce
//! is what stops a transaction from being replayed.
//!
//! [`AccountState`] keeps this projection up to date as blocks are pushed
//! and popped. [`AccountState::rescan`] rebuilds it from scratch; the two
//! must always agree. [`PendingAccounts`] layers a block's transactions on
//! top of a projection without copying it.

use hashbrown::HashMap;
use luncheon_consensus::block_reward;
use luncheon_core::{Block, ChainParams, Transaction};

/// Derived view of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Spendable balance in LUNCHEON units.
    pub balance: u64,
    /// Transactions sent so far; the nonce the next one must carry.
    pub nonce: u32,
}

// Running totals; wide enough that pushes and pops invert exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Totals {
    received: u128,
    rewards: u128,
    sent: u64,
}

impl Totals {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn view(&self) -> Account {
        let balance = self.received + self.rewards;
        Account {
            balance: u64::try_from(balance).unwrap_or(u64::MAX),
            nonce: u32::try_from(self.sent).unwrap_or(u32::MAX),
        }
    }
}

/// Per-account totals keyed by public key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    entries: HashMap<String, Totals>,
}

impl AccountState {
    /// Empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the projection by scanning every block of `blocks`.
    pub fn rescan(blocks: &[Block], params: &ChainParams) -> Self {
        let mut state = Self::new();
        let Some(height) = (blocks.len() as u64).checked_sub(1) else {
            return state;
        };

        for (index, block) in blocks.iter().enumerate() {
            let index = index as u64;
            if index.saturating_add(params.maturity_depth) < height {
                state.credit_reward(block, index, params);
            }
            for tx in &block.transactions {
                state.apply_tx(tx);
            }
        }
        state.prune();
        state
    }

    /// View of `key`; unknown keys are empty accounts.
    pub fn account(&self, key: &str) -> Account {
        self.totals(key).view()
    }

    fn totals(&self, key: &str) -> Totals {
        self.entries.get(key).copied().unwrap_or_default()
    }

    /// Every known account.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Account)> + '_ {
        self.entries.iter().map(|(k, t)| (k.as_str(), t.view()))
    }

    /// Number of accounts with any history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no account has any history.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply one transfer: credit the recipient and advance the sender's
    /// nonce.
    pub fn apply_tx(&mut self, tx: &Transaction) {
        self.entries.entry_ref(tx.to.as_str()).or_default().received += u128::from(tx.value);
        self.entries.entry_ref(tx.from.as_str()).or_default().sent += 1;
    }

    fn revert_tx(&mut self, tx: &Transaction) {
        if let Some(sender) = self.entries.get_mut(tx.from.as_str()) {
            sender.sent = sender.sent.saturating_sub(1);
        }
        if let Some(recipient) = self.entries.get_mut(tx.to.as_str()) {
            recipient.received = recipient.received.saturating_sub(u128::from(tx.value));
        }
    }

    /// Account for the last block of `blocks`, which has just been appended.
    pub fn push_block(&mut self, blocks: &[Block], params: &ChainParams) {
        let Some(tip) = blocks.last() else {
            return;
        };
        let height = blocks.len() as u64 - 1;

        let matured = matured_at(height, params)
            .and_then(|index| Some((index, blocks.get(index as usize)?)));
        if let Some((index, block)) = matured {
            self.credit_reward(block, index, params);
        }
        for tx in &tip.transactions {
            self.apply_tx(tx);
        }
        self.prune_touched(matured.map(|(_, b)| b), &tip.transactions);
    }

    /// Undo [`Self::push_block`] for `removed`, which was the tip before it
    /// was popped off `blocks`.
    pub fn pop_block(&mut self, blocks: &[Block], removed: &Block, params: &ChainParams) {
        let old_height = blocks.len() as u64;

        for tx in removed.transactions.iter().rev() {
            self.revert_tx(tx);
        }
        let matured = matured_at(old_height, params)
            .and_then(|index| Some((index, blocks.get(index as usize)?)));
        if let Some((index, block)) = matured {
            let reward = u128::from(block_reward(index, params.halving_interval));
            if let Some(miner) = self.entries.get_mut(block.miner.as_str()) {
                miner.rewards = miner.rewards.saturating_sub(reward);
            }
        }
        self.prune_touched(matured.map(|(_, b)| b), &removed.transactions);
    }

    fn credit_reward(&mut self, block: &Block, index: u64, params: &ChainParams) {
        if block.miner.is_empty() {
            return;
        }
        let reward = block_reward(index, params.halving_interval);
        self.entries.entry_ref(block.miner.as_str()).or_default().rewards += u128::from(reward);
    }

    fn prune(&mut self) {
        self.entries.retain(|_, totals| !totals.is_empty());
    }

    // Only the keys a push or pop changed can have become empty.
    fn prune_touched(&mut self, rewarded: Option<&Block>, txs: &[Transaction]) {
        let keys = rewarded
            .map(|b| b.miner.as_str())
            .into_iter()
            .chain(txs.iter().flat_map(|tx| [tx.from.as_str(), tx.to.as_str()]));
        for key in keys {
            if self.entries.get(key).is_some_and(Totals::is_empty) {
                self.entries.remove(key);
            }
        }
    }
}

/// Transactions applied on top of a borrowed [`AccountState`].
///
/// Only the accounts a transaction touches are copied, so checking a block
/// costs as much as the block rather than the whole projection.
#[derive(Debug)]
pub struct PendingAccounts<'a> {
    base: &'a AccountState,
    touched: HashMap<String, Totals>,
}

impl<'a> PendingAccounts<'a> {
    /// Overlay with nothing applied yet.
    pub fn new(base: &'a AccountState) -> Self {
        Self {
            base,
            touched: HashMap::new(),
        }
    }

    /// View of `key` including the transactions applied so far.
    pub fn account(&self, key: &str) -> Account {
        match self.touched.get(key) {
            Some(totals) => totals.view(),
            None => self.base.account(key),
        }
    }

    /// Same effect as [`AccountState::apply_tx`], kept in the overlay.
    pub fn apply_tx(&mut self, tx: &Transaction) {
        self.touch(&tx.to).received += u128::from(tx.value);
        self.touch(&tx.from).sent += 1;
    }

    fn touch(&mut self, key: &str) -> &mut Totals {
        let base = self.base;
        self.touched
            .entry_ref(key)
            .or_insert_with(|| base.totals(key))
    }
}

/// Index of the block whose reward matures when the chain reaches `height`.
fn matured_at(height: u64, params: &ChainParams) -> Option<u64> {
    height.checked_sub(params.maturity_depth.checked_add(1)?)
}
