#![allow(dead_code)]

use std::sync::Arc;

use luncheon_consensus::{Miner, MinerConfig};
use luncheon_core::{Block, ChainParams, FixedClock, MessageSigner, Secp256k1Signer, Transaction};
use luncheon_state::{Ledger, Validator};

/// Wall clock seen by test validators.
pub const NOW: u64 = 10_000_000;

/// Spacing between mined test blocks.
pub const SPACING: u64 = 60;

pub fn key(seed: u8) -> Secp256k1Signer {
    Secp256k1Signer::from_bytes(&[seed; 32]).expect("test key")
}

pub fn params(genesis_miner: &Secp256k1Signer) -> ChainParams {
    ChainParams::regtest().with_genesis_miner(genesis_miner.public_key_hex())
}

pub fn validator(params: &ChainParams) -> Validator {
    Validator::new(params.clone()).with_clock(Arc::new(FixedClock(NOW)))
}

pub fn mine_at(candidate: Block, timestamp: u64) -> Block {
    let config = MinerConfig::from_params(&ChainParams::regtest());
    Miner::with_clock(config, Arc::new(FixedClock(timestamp)))
        .start(candidate)
        .expect("regtest block mines")
}

/// Solve the next block of `ledger` one spacing after the tip.
pub fn mine_next(ledger: &Ledger, miner: &Secp256k1Signer, txs: Vec<Transaction>) -> Block {
    let ts = ledger.tip().map_or(0, |b| b.timestamp) + SPACING;
    let candidate = ledger
        .candidate(miner.public_key_hex(), txs)
        .expect("candidate");
    mine_at(candidate, ts)
}

/// Mine and submit `n` empty blocks paying `miner`.
pub fn extend(ledger: &mut Ledger, validator: &Validator, miner: &Secp256k1Signer, n: usize) {
    for _ in 0..n {
        let block = mine_next(ledger, miner, vec![]);
        ledger
            .submit_block(validator, block, true)
            .expect("empty block accepted");
    }
}

pub fn signed_tx(from: &Secp256k1Signer, to: &Secp256k1Signer, value: u64, nonce: u32) -> Transaction {
    let mut tx = Transaction::new(from.public_key_hex(), to.public_key_hex(), value, nonce);
    tx.sign(from).expect("sign");
    tx
}
