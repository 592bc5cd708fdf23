// Consensus-critical. Changes require a protocol version bump + tests.
//! Canonical protocol types for Luncheon.
//!
//! This module defines the consensus-visible data structures: the 32-byte
//! hash, the account-based transaction and the block. Field order and byte
//! layout of the hashing inputs are part of the wire contract.

use borsh::{BorshDeserialize, BorshSerialize};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::*;
use crate::crypto::MessageSigner;
use crate::serialization::{hash32, merkle_root, to_bytes};

/// Errors related to parsing, validation, or construction of core protocol types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Hex string had an unexpected byte length.
    #[error("invalid hex length: expected {expected} bytes, got {got} bytes")]
    InvalidHexLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes provided.
        got: usize,
    },

    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A key or signature could not be used by the signing backend.
    #[error("signing failed: {0}")]
    Signing(&'static str),

    /// A value violated protocol constraints.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

/// Fixed-size 32-byte hash used throughout the protocol.
///
/// Displayed, parsed and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct Hash32(pub [u8; HASH32_LEN]);

impl Hash32 {
    /// Returns an all-zero hash.
    pub const fn zero() -> Self {
        Self([0u8; HASH32_LEN])
    }

    /// Returns the underlying byte array.
    pub const fn as_bytes(&self) -> &[u8; HASH32_LEN] {
        &self.0
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; HASH32_LEN]> for Hash32 {
    fn from(value: [u8; HASH32_LEN]) -> Self {
        Self(value)
    }
}

impl FromStr for Hash32 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH32_LEN {
            return Err(CoreError::InvalidHexLength {
                expected: HASH32_LEN,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; HASH32_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Block hash type.
pub type BlockHash = Hash32;

/// Transaction identifier type.
pub type TxId = Hash32;

/// Fee owed for a transaction of the given weight.
pub fn compute_fee(weight: u64) -> u64 {
    weight
        .saturating_add(SIGNATURE_WEIGHT_ALLOWANCE)
        .saturating_mul(FEE_PER_WEIGHT)
}

/// Account-to-account value transfer.
///
/// The Borsh encoding of these fields, in declaration order, is the
/// canonical byte form used for signing and for transaction ids.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// Sender public key (hex).
    pub from: String,
    /// Recipient public key (hex).
    pub to: String,
    /// Transferred amount in LUNCHEON units.
    pub value: u64,
    /// Fee in LUNCHEON units, derived from the transaction weight.
    pub fee: u64,
    /// Number of transactions the sender had on chain before this one.
    pub nonce: u32,
    /// Detached signature (hex); empty while unsigned.
    pub signature: String,
}

impl Transaction {
    /// Build an unsigned transaction and price it from its unsigned weight.
    pub fn new(from: impl Into<String>, to: impl Into<String>, value: u64, nonce: u32) -> Self {
        let mut tx = Self {
            from: from.into(),
            to: to.into(),
            value,
            fee: 0,
            nonce,
            signature: String::new(),
        };
        tx.fee = compute_fee(tx.compute_weight());
        tx
    }

    /// Canonical byte form, signature included as currently set.
    pub fn as_bytes(&self) -> Result<Vec<u8>, CoreError> {
        to_bytes(self)
    }

    /// Canonical byte form with the signature cleared; the signing payload.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let unsigned = Self {
            signature: String::new(),
            ..self.clone()
        };
        unsigned.as_bytes()
    }

    /// Hash of [`Self::signing_bytes`]; what the signature commits to.
    pub fn signing_hash(&self) -> Result<Hash32, CoreError> {
        Ok(hash32(&self.signing_bytes()?))
    }

    /// Transaction id: hash of the full canonical bytes.
    pub fn txid(&self) -> Result<TxId, CoreError> {
        Ok(hash32(&self.as_bytes()?))
    }

    /// Size-based weight: the fixed numeric fields, both key strings and,
    /// once signed, the signature bytes.
    pub fn compute_weight(&self) -> u64 {
        TX_FIXED_WEIGHT
            + self.from.len() as u64
            + self.to.len() as u64
            + (self.signature.len() / 2) as u64
    }

    /// Sign the transaction in place with `signer`.
    pub fn sign(&mut self, signer: &dyn MessageSigner) -> Result<(), CoreError> {
        let payload = self.signing_bytes()?;
        self.signature = hex::encode(signer.sign(&payload)?);
        Ok(())
    }

    /// Decoded signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(hex::decode(&self.signature)?)
    }
}

/// Full block: header fields, transactions and the derived block hash.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Software version of the producer.
    pub software_version: String,
    /// Hash of the previous block.
    pub prev_hash: BlockHash,
    /// Merkle root of the transaction ids.
    pub merkle_root: Hash32,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Compact difficulty target.
    pub packed_target: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
    /// Public key (hex) credited with the block reward.
    pub miner: String,
    /// Transactions included in this block.
    pub transactions: Vec<Transaction>,
    /// Hash of [`Self::header_bytes`], set once the block is solved.
    pub block_hash: BlockHash,
}

impl Block {
    /// Unsolved block with its Merkle root computed; timestamp, nonce and
    /// block hash are left for the miner.
    pub fn candidate(
        software_version: impl Into<String>,
        prev_hash: BlockHash,
        packed_target: u32,
        miner: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Self, CoreError> {
        let merkle_root = merkle_root(&transactions)?;
        Ok(Self {
            software_version: software_version.into(),
            prev_hash,
            merkle_root,
            timestamp: 0,
            packed_target,
            nonce: 0,
            miner: miner.into(),
            transactions,
            block_hash: Hash32::zero(),
        })
    }

    /// Header fields up to and including the packed target.
    ///
    /// Constant across mining attempts; the miner appends timestamp and nonce.
    pub fn header_prefix(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.software_version.len() + 2 * HASH32_LEN + 4 + 12);
        out.extend_from_slice(self.software_version.as_bytes());
        out.extend_from_slice(self.prev_hash.as_bytes());
        out.extend_from_slice(self.merkle_root.as_bytes());
        out.extend_from_slice(&self.packed_target.to_be_bytes());
        out
    }

    /// Hashing input: `software_version ‖ prev_hash ‖ merkle_root ‖
    /// packed_target ‖ timestamp ‖ nonce`, integers big-endian.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = self.header_prefix();
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out
    }

    /// Hash of the header as currently filled in.
    pub fn compute_hash(&self) -> BlockHash {
        hash32(&self.header_bytes())
    }

    /// Merkle root of the current transaction list.
    pub fn compute_merkle_root(&self) -> Result<Hash32, CoreError> {
        merkle_root(&self.transactions)
    }

    /// Replace the transaction list, re-deriving the Merkle root.
    ///
    /// The proof of work no longer covers the header, so timestamp, nonce and
    /// block hash are reset and the block must be mined again.
    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Result<Self, CoreError> {
        self.merkle_root = merkle_root(&transactions)?;
        self.transactions = transactions;
        self.timestamp = 0;
        self.nonce = 0;
        self.block_hash = Hash32::zero();
        Ok(self)
    }

    /// Remove and return the transaction at `index`, if present.
    pub fn remove_transaction(&mut self, index: usize) -> Option<Transaction> {
        (index < self.transactions.len()).then(|| self.transactions.remove(index))
    }
}
