//! Ledger, validation and persistence errors.

use luncheon_core::CoreError;
use thiserror::Error;

/// Why a block failed header or chain-linkage validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BlockRejection {
    /// Producer software version differs from ours.
    #[error("software version mismatch: expected {expected:?}, got {got:?}")]
    VersionMismatch {
        /// Version this node runs.
        expected: String,
        /// Version carried by the block.
        got: String,
    },

    /// Stored block hash differs from the recomputed header hash.
    #[error("block hash does not match header")]
    HashMismatch,

    /// Block does not extend the current tip.
    #[error("previous hash does not match tip")]
    PrevHashMismatch,

    /// Timestamp is older than the tip's.
    #[error("timestamp {got} is before tip timestamp {tip}")]
    TimestampBeforeTip {
        /// Tip timestamp.
        tip: u64,
        /// Block timestamp.
        got: u64,
    },

    /// Timestamp is ahead of the local clock.
    #[error("timestamp {got} is in the future (now {now})")]
    TimestampInFuture {
        /// Local clock reading.
        now: u64,
        /// Block timestamp.
        got: u64,
    },

    /// Packed target differs from the one required at this height.
    #[error("packed target 0x{got:08x} does not match required 0x{expected:08x}")]
    TargetMismatch {
        /// Required compact target.
        expected: u32,
        /// Compact target carried by the block.
        got: u32,
    },

    /// Block hash is above the target.
    #[error("insufficient proof of work")]
    InsufficientWork,

    /// Merkle root does not commit to the transaction list.
    #[error("merkle root mismatch")]
    MerkleMismatch,

    /// Transactions could not be encoded for hashing.
    #[error("malformed block: {0}")]
    Malformed(&'static str),
}

/// Why a single transaction was refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TxRejection {
    /// Fee below the size-derived minimum.
    #[error("fee {got} below required {required}")]
    FeeTooLow {
        /// Fee derived from the transaction weight.
        required: u64,
        /// Fee carried by the transaction.
        got: u64,
    },

    /// Sender cannot cover value plus fee.
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        /// Spendable balance of the sender.
        balance: u64,
        /// Value plus fee.
        required: u128,
    },

    /// Nonce is not the sender's next sequence number.
    #[error("nonce {got} does not match expected {expected}")]
    NonceMismatch {
        /// Count of transactions the sender already has on chain.
        expected: u32,
        /// Nonce carried by the transaction.
        got: u32,
    },

    /// Signature does not verify under the sender key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Key, signature or payload could not be decoded.
    #[error("malformed transaction: {0}")]
    Malformed(&'static str),
}

/// Errors produced by ledger mutation and persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem failure while reading or writing a ledger.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored ledger document could not be encoded or decoded.
    #[error("ledger document error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core type construction failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Block failed header or linkage validation.
    #[error("block rejected: {0}")]
    BlockRejected(#[from] BlockRejection),

    /// Block header was valid but some transactions were not.
    #[error("{} transaction(s) rejected", rejected.len())]
    TransactionsRejected {
        /// Index of each rejected transaction with the reason.
        rejected: Vec<(usize, TxRejection)>,
    },

    /// Ledger name is empty or contains path components.
    #[error("invalid ledger name {0:?}")]
    InvalidLedgerName(String),
}
