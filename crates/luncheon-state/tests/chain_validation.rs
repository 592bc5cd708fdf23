mod common;

use common::*;
use luncheon_consensus::{hash_meets_target, unpack_target};
use luncheon_core::{Block, ChainParams, Hash32, MessageSigner, Transaction};
use luncheon_state::{genesis_block, BlockRejection, Ledger, StateError, TxRejection};

/// Ledger whose genesis reward (to `a`) has matured: height 3.
fn funded_ledger(a: &luncheon_core::Secp256k1Signer) -> (Ledger, luncheon_state::Validator) {
    let params = params(a);
    let v = validator(&params);
    let mut ledger = Ledger::init(params);
    extend(&mut ledger, &v, a, 3);
    assert_eq!(ledger.account(&a.public_key_hex()).balance, 200_000_000);
    (ledger, v)
}

#[test]
fn genesis_chain_is_valid() {
    let a = key(1);
    let ledger = Ledger::init(params(&a));
    assert!(validator(ledger.params()).verify_blockchain(&ledger));
    assert!(validator(ledger.params()).verify_blockchain(&Ledger::from_blocks(
        ledger.params().clone(),
        vec![]
    )));
}

#[test]
fn malformed_genesis_fails_chain_check() {
    let a = key(1);
    let p = params(&a);

    let mut with_tx = genesis_block(&p);
    with_tx.transactions.push(Transaction::new("aa", "bb", 1, 0));
    let ledger = Ledger::from_blocks(p.clone(), vec![with_tx]);
    assert!(!validator(&p).verify_blockchain(&ledger));

    let mut wrong_target = genesis_block(&p);
    wrong_target.packed_target = 0x1d0f_ffff;
    wrong_target.block_hash = wrong_target.compute_hash();
    let ledger = Ledger::from_blocks(p.clone(), vec![wrong_target]);
    assert!(!validator(&p).verify_blockchain(&ledger));
}

#[test]
fn mined_chain_verifies() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);

    let tx = signed_tx(&a, &b, 1_000, 0);
    let block = mine_next(&ledger, &a, vec![tx]);
    ledger.submit_block(&v, block, true).unwrap();
    extend(&mut ledger, &v, &b, 3);

    assert_eq!(ledger.height(), Some(7));
    assert!(v.verify_blockchain(&ledger));
}

#[test]
fn broken_linkage_fails_chain_check() {
    let a = key(1);
    let (ledger, v) = funded_ledger(&a);

    for i in 1..ledger.len() {
        let mut blocks = ledger.blocks().to_vec();
        blocks[i].prev_hash = Hash32([0xab; 32]);
        let tampered = Ledger::from_blocks(ledger.params().clone(), blocks);
        assert!(!v.verify_blockchain(&tampered), "prev_hash of block {i}");
    }

    let mut blocks = ledger.blocks().to_vec();
    blocks[1].nonce = blocks[1].nonce.wrapping_add(1);
    let tampered = Ledger::from_blocks(ledger.params().clone(), blocks);
    assert!(!v.verify_blockchain(&tampered));
}

#[test]
fn tampered_transaction_fails_chain_check() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);
    let block = mine_next(&ledger, &a, vec![signed_tx(&a, &b, 1_000, 0)]);
    ledger.submit_block(&v, block, true).unwrap();

    let mut blocks = ledger.blocks().to_vec();
    blocks[4].transactions[0].value = 2_000;
    let tampered = Ledger::from_blocks(ledger.params().clone(), blocks);
    assert!(!v.verify_blockchain(&tampered));
}

#[test]
fn header_rules_reject_in_order() {
    let a = key(1);
    let p = params(&a);
    let v = validator(&p);
    let mut ledger = Ledger::init(p.clone());
    extend(&mut ledger, &v, &a, 1);
    let tip_ts = ledger.tip().unwrap().timestamp;

    // Version, only when asked for.
    let mut other_version = ledger.candidate(a.public_key_hex(), vec![]).unwrap();
    other_version.software_version = "Luncheon 0.9".into();
    let other_version = mine_at(other_version, tip_ts + 1);
    assert!(matches!(
        v.validate_block(&ledger, &other_version, true),
        Err(BlockRejection::VersionMismatch { .. })
    ));
    assert!(v.validate_block(&ledger, &other_version, false).is_ok());

    // Stored hash must match the header.
    let mut bad_hash = mine_next(&ledger, &a, vec![]);
    bad_hash.nonce = bad_hash.nonce.wrapping_add(1);
    assert_eq!(
        v.validate_block(&ledger, &bad_hash, true),
        Err(BlockRejection::HashMismatch)
    );

    // Must extend the tip.
    let mut orphan = ledger.candidate(a.public_key_hex(), vec![]).unwrap();
    orphan.prev_hash = ledger.blocks()[0].block_hash;
    let orphan = mine_at(orphan, tip_ts + 1);
    assert_eq!(
        v.validate_block(&ledger, &orphan, true),
        Err(BlockRejection::PrevHashMismatch)
    );

    // Timestamp window.
    let early = mine_at(ledger.candidate(a.public_key_hex(), vec![]).unwrap(), tip_ts - 1);
    assert!(matches!(
        v.validate_block(&ledger, &early, true),
        Err(BlockRejection::TimestampBeforeTip { .. })
    ));
    let late = mine_at(ledger.candidate(a.public_key_hex(), vec![]).unwrap(), NOW + 1);
    assert_eq!(
        v.validate_block(&ledger, &late, true),
        Err(BlockRejection::TimestampInFuture { now: NOW, got: NOW + 1 })
    );
    let same_second = mine_at(ledger.candidate(a.public_key_hex(), vec![]).unwrap(), tip_ts);
    assert!(v.validate_block(&ledger, &same_second, true).is_ok());

    // Target must be the one required at this height.
    let mut wrong_target = ledger.candidate(a.public_key_hex(), vec![]).unwrap();
    wrong_target.packed_target = 0x2000_ffff;
    let wrong_target = mine_at(wrong_target, tip_ts + 1);
    assert_eq!(
        v.validate_block(&ledger, &wrong_target, true),
        Err(BlockRejection::TargetMismatch {
            expected: 0x207f_ffff,
            got: 0x2000_ffff
        })
    );

    // Self-consistent hash that misses the target.
    let mut weak = ledger.candidate(a.public_key_hex(), vec![]).unwrap();
    weak.timestamp = tip_ts + 1;
    let target = unpack_target(weak.packed_target);
    while hash_meets_target(&weak.compute_hash(), &target) {
        weak.nonce += 1;
    }
    weak.block_hash = weak.compute_hash();
    assert_eq!(
        v.validate_block(&ledger, &weak, true),
        Err(BlockRejection::InsufficientWork)
    );

    // Merkle root must commit to the transactions.
    let mut stuffed = ledger.candidate(a.public_key_hex(), vec![]).unwrap();
    stuffed.transactions.push(Transaction::new("aa", "bb", 1, 0));
    let stuffed = mine_at(stuffed, tip_ts + 1);
    assert_eq!(
        v.validate_block(&ledger, &stuffed, true),
        Err(BlockRejection::MerkleMismatch)
    );
}

#[test]
fn balance_follows_transfers_and_maturity() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);

    let tx = signed_tx(&a, &b, 50_000_000, 0);
    let block = mine_next(&ledger, &b, vec![tx]);
    ledger.submit_block(&v, block, true).unwrap();

    // Height 4: genesis and block 1 (both paying `a`) have matured.
    // Sending only moves the nonce.
    let acct_a = ledger.account(&a.public_key_hex());
    assert_eq!(acct_a.balance, 400_000_000);
    assert_eq!(acct_a.nonce, 1);
    let acct_b = ledger.account(&b.public_key_hex());
    assert_eq!(acct_b.balance, 50_000_000);
    assert_eq!(acct_b.nonce, 0);
}

#[test]
fn spent_sender_can_spend_again() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);

    let first = signed_tx(&a, &b, 150_000_000, 0);
    let block = mine_next(&ledger, &b, vec![first]);
    ledger.submit_block(&v, block, true).unwrap();

    // Height 4: two matured rewards; the first send does not count against them.
    assert_eq!(ledger.account(&a.public_key_hex()).balance, 400_000_000);
    let second = signed_tx(&a, &b, 300_000_000, 1);
    assert_eq!(v.check_tx(ledger.accounts(), &second), Ok(()));
    let block = mine_next(&ledger, &b, vec![second]);
    ledger.submit_block(&v, block, true).unwrap();
    assert_eq!(ledger.account(&b.public_key_hex()).balance, 450_000_000);
    assert!(v.verify_blockchain(&ledger));
}

#[test]
fn overspend_is_rejected() {
    let a = key(1);
    let b = key(2);
    let (ledger, v) = funded_ledger(&a);

    let tx = signed_tx(&a, &b, 200_000_000, 0);
    assert!(!v.verify_tx(&ledger, &tx));
    assert!(matches!(
        v.check_tx(ledger.accounts(), &tx),
        Err(TxRejection::InsufficientBalance { balance: 200_000_000, .. })
    ));

    let affordable = signed_tx(&a, &b, 200_000_000 - tx.fee, 0);
    assert!(v.verify_tx(&ledger, &affordable));
}

#[test]
fn replayed_transaction_is_rejected() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);

    let tx = signed_tx(&a, &b, 1_000, 0);
    let block = mine_next(&ledger, &a, vec![tx.clone()]);
    ledger.submit_block(&v, block, true).unwrap();

    assert_eq!(
        v.check_tx(ledger.accounts(), &tx),
        Err(TxRejection::NonceMismatch { expected: 1, got: 0 })
    );
    let replay = mine_next(&ledger, &a, vec![tx]);
    let err = ledger.submit_block(&v, replay, true).unwrap_err();
    assert!(matches!(err, StateError::TransactionsRejected { ref rejected } if rejected.len() == 1));
    assert_eq!(ledger.height(), Some(4));
}

#[test]
fn signature_must_match_sender() {
    let a = key(1);
    let b = key(2);
    let (ledger, v) = funded_ledger(&a);

    let mut forged = Transaction::new(a.public_key_hex(), b.public_key_hex(), 1_000, 0);
    forged.sign(&b).unwrap();
    assert_eq!(
        v.check_tx(ledger.accounts(), &forged),
        Err(TxRejection::InvalidSignature)
    );

    let mut altered = signed_tx(&a, &b, 1_000, 0);
    altered.to = a.public_key_hex();
    assert_eq!(
        v.check_tx(ledger.accounts(), &altered),
        Err(TxRejection::InvalidSignature)
    );
}

#[test]
fn sequential_spends_in_one_block() {
    let a = key(1);
    let b = key(2);
    let (mut ledger, v) = funded_ledger(&a);

    let txs = vec![signed_tx(&a, &b, 1_000, 0), signed_tx(&a, &b, 2_000, 1)];
    let block = mine_next(&ledger, &a, txs);
    let outcome = ledger.submit_block(&v, block, true).unwrap();
    assert_eq!(outcome.accepted, vec![0, 1]);
    assert_eq!(ledger.account(&a.public_key_hex()).nonce, 2);
    assert_eq!(ledger.account(&b.public_key_hex()).balance, 3_000);
}

#[test]
fn verify_block_prunes_rejected_transactions() {
    let a = key(1);
    let b = key(2);
    let (ledger, v) = funded_ledger(&a);

    let good = signed_tx(&a, &b, 1_000, 0);
    let wrong_nonce = signed_tx(&a, &b, 1_000, 5);
    let broke = signed_tx(&b, &a, 1_000, 0);
    let mut block = mine_next(&ledger, &a, vec![wrong_nonce, good.clone(), broke]);

    let outcome = v.validate_block(&ledger, &block, true).unwrap();
    assert_eq!(outcome.accepted, vec![1]);
    assert_eq!(outcome.rejected.len(), 2);

    assert!(v.verify_block(&ledger, &mut block, true));
    assert_eq!(block.transactions, vec![good]);
}

#[test]
fn verify_block_rejects_bad_header_without_pruning() {
    let a = key(1);
    let (ledger, v) = funded_ledger(&a);
    let mut block: Block = mine_next(&ledger, &a, vec![Transaction::new("aa", "bb", 1, 0)]);
    block.prev_hash = luncheon_core::Hash32::zero();

    assert!(!v.verify_block(&ledger, &mut block, true));
    assert_eq!(block.transactions.len(), 1);
}

#[test]
fn retarget_on_schedule_doubled_and_clamped() {
    let p = ChainParams::regtest();
    let harder = 0x1f0f_ffff;

    let chain_with = |last_ts: u64, packed: u32| {
        let mut ledger = Ledger::init(p.clone());
        for i in 1..5u64 {
            let mut b = ledger.candidate("aa", vec![]).unwrap();
            b.packed_target = packed;
            b.timestamp = if i == 4 { last_ts } else { i };
            b.block_hash = b.compute_hash();
            ledger.add_block(b);
        }
        ledger
    };

    // interval 5, block time 60: 300 seconds is on schedule.
    assert_eq!(chain_with(300, harder).calculate_packed_target(5), harder);
    assert_eq!(chain_with(150, harder).calculate_packed_target(5), 0x1f1f_fffe);
    assert_eq!(chain_with(1, 0x200f_ffff).calculate_packed_target(5), p.max_packed_target);

    // Between boundaries the previous target carries over.
    let ledger = chain_with(150, harder);
    assert_eq!(ledger.calculate_packed_target(4), harder);
}
