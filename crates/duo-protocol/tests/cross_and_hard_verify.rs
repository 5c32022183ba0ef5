use std::collections::BTreeMap;

use duo_chain::Chain;
use duo_core::ChainId;
use duo_protocol::{confirm_verify, cross_verify, hard_verify, send_signal};

fn chain(id: &str) -> Chain {
    Chain::new(ChainId::from(id), format!("seed-{id}"))
}

#[test]
fn cross_verify_succeeds_after_a_clean_signal_exchange() {
    let mut a = chain("a");
    let mut b = chain("b");
    send_signal(&mut a, &mut b, BTreeMap::new(), None, None, 1_000).unwrap();

    assert!(cross_verify(&a, &b).is_ok());
}

#[test]
fn cross_verify_fails_when_a_claims_a_signal_b_never_sent() {
    let mut a = chain("a");
    let b = chain("b");

    // a claims to have received something from b, but b has no record of it.
    use duo_core::block::{BlockHeader, BlockPayload, SignalReceivedPayload};
    use duo_core::{Amount, Block, BlockKind};
    a.append(Block::new(
        BlockHeader::pending(BlockKind::SignalReceived, 1_000, Amount::ZERO),
        BlockPayload::SignalReceived(SignalReceivedPayload {
            src_chain_id: b.uuid.clone(),
            send_signal_block_hash: "nonexistent".into(),
            signal_data: BTreeMap::new(),
            amount: None,
        }),
    ))
    .unwrap();

    assert!(cross_verify(&a, &b).is_err());
}

#[test]
fn hard_verify_writes_attestation_blocks_when_sub_chain_has_more_than_one_block() {
    let mut a = chain("a");
    let mut b = chain("b");
    send_signal(&mut a, &mut b, BTreeMap::new(), None, None, 1_000).unwrap();

    let outcome = hard_verify(&mut a, &mut b, 2_000).unwrap();
    assert!(outcome.verification_hash.is_some());
    assert!(outcome.close_hash.is_some());
    assert!(confirm_verify(&a, &b.uuid).unwrap());
}

#[test]
fn hard_verify_writes_only_the_open_block_on_a_single_block_sub_chain() {
    let mut a = chain("a");
    let mut b = chain("b");

    let outcome = hard_verify(&mut a, &mut b, 1_000).unwrap();
    assert!(outcome.verification_hash.is_none());
    assert!(outcome.close_hash.is_none());
}

#[test]
fn confirm_verify_still_matches_after_a_second_round_of_signalling_and_hard_verify() {
    let mut a = chain("a");
    let mut b = chain("b");

    send_signal(&mut a, &mut b, BTreeMap::new(), None, None, 1_000).unwrap();
    let first = hard_verify(&mut a, &mut b, 2_000).unwrap();
    assert!(first.verification_hash.is_some());
    assert!(confirm_verify(&a, &b.uuid).unwrap());

    // A second signal, then a second hard-verify: the sub-chain window now
    // starts at (and includes) the first `Verification` block, since it too
    // names `b` as `src_chain_id`. `confirm_verify` must recompute the same
    // window `hard_verify` hashed, not one that skips that boundary block.
    send_signal(&mut a, &mut b, BTreeMap::new(), None, None, 3_000).unwrap();
    let second = hard_verify(&mut a, &mut b, 4_000).unwrap();
    assert!(second.verification_hash.is_some());
    assert!(confirm_verify(&a, &b.uuid).unwrap());
}
