//! Consensus error types.

use thiserror::Error;

/// Errors returned by target conversion and proof-of-work checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    /// Target does not fit the 256-bit compact encoding.
    #[error("target exceeds 256 bits")]
    TargetOverflow,

    /// Proof-of-work hash did not meet the required target.
    #[error("insufficient proof of work")]
    InsufficientPoW,

    /// Stored block hash differs from the recomputed header hash.
    #[error("block hash does not match header")]
    HashMismatch,
}

/// Reasons a proof-of-work search ends without a solution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiningError {
    /// Compact target is zero or above the configured ceiling.
    #[error("invalid target 0x{0:08x}")]
    InvalidTarget(u32),

    /// Candidate header is missing required fields.
    #[error("malformed candidate: {0}")]
    MalformedCandidate(&'static str),

    /// Every nonce was tried without meeting the target.
    #[error("nonce space exhausted")]
    Exhausted,

    /// The search was stopped through its stop handle.
    #[error("mining cancelled")]
    Cancelled,

    /// The mining worker thread panicked.
    #[error("mining worker panicked")]
    WorkerPanicked,
}
