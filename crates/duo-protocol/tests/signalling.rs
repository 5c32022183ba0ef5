use std::collections::BTreeMap;
use std::str::FromStr;

use duo_chain::Chain;
use duo_core::{Amount, ChainId};
use duo_protocol::{send_signal, DeliveryOptions};

fn chain(id: &str) -> Chain {
    Chain::new(ChainId::from(id), format!("seed-{id}"))
}

#[test]
fn send_signal_without_delivery_moves_default_reward() {
    let mut src = chain("src");
    let mut dest = chain("dest");

    let outcome = send_signal(&mut src, &mut dest, BTreeMap::new(), None, None, 1_000)
        .expect("signal exchange succeeds");

    assert!(outcome.delivered_hash.is_none());
    assert_eq!(src.balance(), Amount::from_str("1.00").unwrap());
    assert_eq!(dest.balance(), Amount::ZERO);
    assert!(src.verify().is_ok());
    assert!(dest.verify().is_ok());

    // dest's received block references src's sent block.
    let received = dest.get_by_hash(outcome.received_hash.as_str()).unwrap();
    match &received.payload {
        duo_core::block::BlockPayload::SignalReceived(p) => {
            assert_eq!(p.send_signal_block_hash, outcome.sent_hash.0);
        }
        _ => panic!("expected SignalReceived"),
    }
}

#[test]
fn send_signal_with_delivery_adds_a_delivered_block() {
    let mut src = chain("src");
    let mut dest = chain("dest");

    let delivery = DeliveryOptions { activity_id: "act-1".into(), cost: 3 };
    let outcome = send_signal(
        &mut src,
        &mut dest,
        BTreeMap::new(),
        Some(Amount::from_str("2.50").unwrap()),
        Some(delivery),
        2_000,
    )
    .unwrap();

    assert!(outcome.delivered_hash.is_some());
    assert_eq!(src.balance(), Amount::from_str("2.50").unwrap());
    assert_eq!(dest.height(), 3);
}

#[test]
fn non_positive_amount_falls_back_to_default_reward() {
    let mut src = chain("src");
    let mut dest = chain("dest");

    let outcome = send_signal(
        &mut src,
        &mut dest,
        BTreeMap::new(),
        Some(Amount::ZERO),
        None,
        3_000,
    )
    .unwrap();

    let credit = src.get_by_hash(outcome.credit_hash.as_str()).unwrap();
    assert_eq!(credit.header.balance_delta, Amount::from_str("1.00").unwrap());
}
