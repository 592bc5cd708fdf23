// Consensus-critical. Changes require a protocol version bump + tests.
//! Block, transaction and chain validation.
//!
//! Rules for a block extending a non-empty ledger, checked in order:
//!
//! 1. An empty ledger accepts any block as genesis.
//! 2. Software version (only when matching is requested).
//! 3. `block_hash` equals the recomputed header hash.
//! 4. `prev_hash` equals the tip's hash.
//! 5. `tip.timestamp <= timestamp <= now`.
//! 6. `packed_target` equals the target required at this height.
//! 7. The block hash meets that target.
//! 8. The Merkle root commits to the transaction list.
//! 9. Each transaction is checked in order against the projection as
//!    updated by the transactions accepted before it.
//!
//! Rules 1 to 8 reject the whole block. Rule 9 reports per transaction.

use std::sync::Arc;

use luncheon_consensus::{hash_meets_target, unpack_target};
use luncheon_core::{
    compute_fee, Block, ChainParams, Clock, Secp256k1Verifier, SignatureVerifier, SystemClock,
    Transaction,
};
use tracing::warn;

use crate::accounts::{Account, AccountState, PendingAccounts};
use crate::chain::Ledger;
use crate::error::{BlockRejection, TxRejection};

/// Per-transaction result of validating a block whose header passed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Indices of transactions that passed, in block order.
    pub accepted: Vec<usize>,
    /// Indices of transactions that failed, with the reason.
    pub rejected: Vec<(usize, TxRejection)>,
}

impl BlockOutcome {
    /// Whether every transaction passed.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Rule checker with injectable time source and signature backend.
#[derive(Clone)]
pub struct Validator {
    params: ChainParams,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl Validator {
    /// Validator using the system clock and secp256k1 signatures.
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            clock: Arc::new(SystemClock),
            verifier: Arc::new(Secp256k1Verifier),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the signature backend.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Chain parameters this validator enforces.
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Check `block` as the next block of `ledger` without modifying either.
    pub fn validate_block(
        &self,
        ledger: &Ledger,
        block: &Block,
        require_version_match: bool,
    ) -> Result<BlockOutcome, BlockRejection> {
        let Some(tip) = ledger.tip() else {
            return Ok(BlockOutcome {
                accepted: (0..block.transactions.len()).collect(),
                rejected: Vec::new(),
            });
        };

        let result = self.check_header(ledger, tip, block, require_version_match);
        if let Err(reason) = &result {
            warn!(hash = %block.block_hash, %reason, "block rejected");
        }
        result?;

        let mut pending = PendingAccounts::new(ledger.accounts());
        let mut outcome = BlockOutcome::default();
        for (index, tx) in block.transactions.iter().enumerate() {
            match self.check_sender(pending.account(&tx.from), tx) {
                Ok(()) => {
                    pending.apply_tx(tx);
                    outcome.accepted.push(index);
                }
                Err(reason) => {
                    warn!(index, from = %tx.from, %reason, "transaction rejected");
                    outcome.rejected.push((index, reason));
                }
            }
        }
        Ok(outcome)
    }

    fn check_header(
        &self,
        ledger: &Ledger,
        tip: &Block,
        block: &Block,
        require_version_match: bool,
    ) -> Result<(), BlockRejection> {
        if require_version_match && block.software_version != self.params.software_version {
            return Err(BlockRejection::VersionMismatch {
                expected: self.params.software_version.clone(),
                got: block.software_version.clone(),
            });
        }

        if block.compute_hash() != block.block_hash {
            return Err(BlockRejection::HashMismatch);
        }

        if block.prev_hash != tip.block_hash {
            return Err(BlockRejection::PrevHashMismatch);
        }

        if block.timestamp < tip.timestamp {
            return Err(BlockRejection::TimestampBeforeTip {
                tip: tip.timestamp,
                got: block.timestamp,
            });
        }
        let now = self.clock.now_unix();
        if block.timestamp > now {
            return Err(BlockRejection::TimestampInFuture {
                now,
                got: block.timestamp,
            });
        }

        let expected = ledger.calculate_packed_target(ledger.len() as u64);
        if block.packed_target != expected {
            return Err(BlockRejection::TargetMismatch {
                expected,
                got: block.packed_target,
            });
        }

        if !hash_meets_target(&block.block_hash, &unpack_target(block.packed_target)) {
            return Err(BlockRejection::InsufficientWork);
        }

        let root = block
            .compute_merkle_root()
            .map_err(|_| BlockRejection::Malformed("transaction encoding failed"))?;
        if root != block.merkle_root {
            return Err(BlockRejection::MerkleMismatch);
        }
        Ok(())
    }

    /// Validate `block` and drop its rejected transactions in place.
    ///
    /// Returns `false` only when the header is rejected. Pruning changes the
    /// transaction list but not the header, so a pruned block must be
    /// re-rooted and re-mined before it can be appended.
    pub fn verify_block(
        &self,
        ledger: &Ledger,
        block: &mut Block,
        require_version_match: bool,
    ) -> bool {
        let Ok(outcome) = self.validate_block(ledger, block, require_version_match) else {
            return false;
        };
        for (index, _) in outcome.rejected.iter().rev() {
            block.remove_transaction(*index);
        }
        true
    }

    /// Whether `tx` could be included in the next block of `ledger`.
    pub fn verify_tx(&self, ledger: &Ledger, tx: &Transaction) -> bool {
        self.check_tx(ledger.accounts(), tx).is_ok()
    }

    /// Check `tx` against the projection `accounts`.
    pub fn check_tx(&self, accounts: &AccountState, tx: &Transaction) -> Result<(), TxRejection> {
        self.check_sender(accounts.account(&tx.from), tx)
    }

    fn check_sender(&self, sender: Account, tx: &Transaction) -> Result<(), TxRejection> {
        let unsigned = Transaction {
            signature: String::new(),
            ..tx.clone()
        };
        let min_fee = compute_fee(unsigned.compute_weight());
        if tx.fee < min_fee {
            return Err(TxRejection::FeeTooLow {
                required: min_fee,
                got: tx.fee,
            });
        }

        let required = u128::from(tx.value) + u128::from(tx.fee);
        if u128::from(sender.balance) < required {
            return Err(TxRejection::InsufficientBalance {
                balance: sender.balance,
                required,
            });
        }

        if tx.nonce != sender.nonce {
            return Err(TxRejection::NonceMismatch {
                expected: sender.nonce,
                got: tx.nonce,
            });
        }

        let public_key =
            hex::decode(&tx.from).map_err(|_| TxRejection::Malformed("sender key is not hex"))?;
        let signature = tx
            .signature_bytes()
            .map_err(|_| TxRejection::Malformed("signature is not hex"))?;
        let message = tx
            .signing_hash()
            .map_err(|_| TxRejection::Malformed("transaction encoding failed"))?;
        if !self.verifier.verify(&public_key, &message, &signature) {
            return Err(TxRejection::InvalidSignature);
        }
        Ok(())
    }

    /// Replay the whole ledger from genesis and check every block against
    /// the chain before it. Any rejected block or transaction fails it.
    pub fn verify_blockchain(&self, ledger: &Ledger) -> bool {
        let Some((genesis, rest)) = ledger.blocks().split_first() else {
            return true;
        };
        if !genesis.transactions.is_empty()
            || genesis.packed_target != self.params.max_packed_target
            || genesis.block_hash != genesis.compute_hash()
        {
            warn!("genesis block rejected");
            return false;
        }

        let mut replay = Ledger::from_blocks(self.params.clone(), vec![genesis.clone()]);
        for block in rest {
            match self.validate_block(&replay, block, false) {
                Ok(outcome) if outcome.is_clean() => replay.add_block(block.clone()),
                _ => {
                    warn!(height = replay.len(), "chain verification failed");
                    return false;
                }
            }
        }
        true
    }
}
