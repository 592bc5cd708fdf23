// Consensus-critical. Changes require a protocol version bump + tests.
//! Canonical serialization and hashing helpers.
//!
//! Rule: every consensus hash is SHAKE-256 truncated to 32 bytes, applied to
//! exact byte concatenations. Transactions are encoded with Borsh; block
//! headers use the fixed field concatenation in [`crate::Block::header_bytes`].

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::constants::*;
use crate::types::{CoreError, Hash32, Transaction};

/// Encode a value with canonical Borsh encoding.
pub fn to_bytes<T: borsh::BorshSerialize>(v: &T) -> Result<Vec<u8>, CoreError> {
    borsh::to_vec(v).map_err(|_| CoreError::InvalidValue("borsh serialization failed"))
}

/// SHAKE-256 over the concatenation of `parts`, read out as 32 bytes.
pub fn shake256_32(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Shake256::default();
    for part in parts {
        hasher.update(part);
    }
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; HASH32_LEN];
    reader.read(&mut out);
    Hash32(out)
}

/// Hash a single byte string.
pub fn hash32(bytes: &[u8]) -> Hash32 {
    shake256_32(&[bytes])
}

/// Merkle root over transaction ids, in list order.
///
/// Each level pairs neighbours left to right; an odd trailing node is paired
/// with itself. An empty list yields the all-zero hash and a single
/// transaction yields its own id.
pub fn merkle_root(txs: &[Transaction]) -> Result<Hash32, CoreError> {
    let mut layer = txs
        .iter()
        .map(Transaction::txid)
        .collect::<Result<Vec<_>, _>>()?;

    if layer.is_empty() {
        return Ok(Hash32::zero());
    }

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                shake256_32(&[left.as_bytes(), right.as_bytes()])
            })
            .collect();
    }

    Ok(layer[0])
}
