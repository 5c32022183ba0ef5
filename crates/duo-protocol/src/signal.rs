//! The send/receive/deliver/reward signalling state machine (§4.4): moves
//! value and signal data from a source chain to a destination chain in six
//! appends across the two chains (seven if delivery is recorded).

use std::collections::BTreeMap;
use std::str::FromStr;

use duo_chain::Chain;
use duo_core::block::{
    BlockHeader, BlockPayload, CreditAcceptedPayload, SignalDeliveredPayload,
    SignalReceivedPayload, SignalRewardReceivedPayload, SignalRewardSentPayload,
    SignalSentPayload,
};
use duo_core::{Amount, Block, BlockHash, BlockKind, DuoError, Timestamp};
use serde_json::Value;

/// Options for an optional `SignalDelivered` step between receipt and reward.
#[derive(Clone, Debug)]
pub struct DeliveryOptions {
    pub activity_id: String,
    pub cost: i64,
}

/// The hash of every block appended across both chains during one signal.
#[derive(Clone, Debug)]
pub struct SignalOutcome {
    pub sent_hash: BlockHash,
    pub received_hash: BlockHash,
    pub delivered_hash: Option<BlockHash>,
    pub reward_sent_hash: BlockHash,
    pub reward_received_hash: BlockHash,
    pub credit_hash: BlockHash,
}

/// Reward defaults to `1.00` when absent or non-positive (§4.4).
fn resolve_amount(amount: Option<Amount>) -> Amount {
    match amount {
        Some(a) if a > Amount::ZERO => a,
        _ => Amount::from_str("1.00").expect("1.00 parses"),
    }
}

/// Runs the full six (or seven) step exchange against both chains in memory.
/// Persisting the two chains afterward is the caller's responsibility — this
/// mirrors `Chain::append`'s own "core does not persist on your behalf in a
/// way you can't see" contract at the pair level.
pub fn send_signal(
    src: &mut Chain,
    dest: &mut Chain,
    signal_data: BTreeMap<String, Value>,
    amount: Option<Amount>,
    delivery: Option<DeliveryOptions>,
    ts: Timestamp,
) -> Result<SignalOutcome, DuoError> {
    let amount = resolve_amount(amount);
    let dest_id = dest.uuid.clone();
    let src_id = src.uuid.clone();

    let sent_hash = src.append(Block::new(
        BlockHeader::pending(BlockKind::SignalSent, ts, Amount::ZERO),
        BlockPayload::SignalSent(SignalSentPayload {
            dest_chain_id: dest_id.clone(),
            signal_data: signal_data.clone(),
            amount: Some(amount),
        }),
    ))?;

    let received_hash = dest.append(Block::new(
        BlockHeader::pending(BlockKind::SignalReceived, ts, Amount::ZERO),
        BlockPayload::SignalReceived(SignalReceivedPayload {
            src_chain_id: src_id.clone(),
            send_signal_block_hash: sent_hash.0.clone(),
            signal_data,
            amount: Some(amount),
        }),
    ))?;

    let (delivered_hash, reward_ref_hash) = match delivery {
        Some(opts) => {
            let h = dest.append(Block::new(
                BlockHeader::pending(BlockKind::SignalDelivered, ts, Amount::ZERO),
                BlockPayload::SignalDelivered(SignalDeliveredPayload {
                    src_chain_id: src_id.clone(),
                    receive_signal_block_hash: received_hash.0.clone(),
                    activity_id: opts.activity_id,
                    cost: opts.cost,
                    amount: Some(amount),
                }),
            ))?;
            (Some(h.clone()), h.0)
        }
        None => (None, received_hash.0.clone()),
    };

    // SignalRewardSent/SignalRewardReceived carry a zero delta by
    // convention — the mint happens via the trailing CreditAccepted (§9c).
    let reward_sent_hash = dest.append(Block::new(
        BlockHeader::pending(BlockKind::SignalRewardSent, ts, Amount::ZERO),
        BlockPayload::SignalRewardSent(SignalRewardSentPayload {
            dest_chain_id: src_id.clone(),
            action_block_hash: None,
            deliver_signal_block_hash: reward_ref_hash,
            amount,
            accepted_amount: None,
        }),
    ))?;

    let reward_received_hash = src.append(Block::new(
        BlockHeader::pending(BlockKind::SignalRewardReceived, ts, Amount::ZERO),
        BlockPayload::SignalRewardReceived(SignalRewardReceivedPayload {
            src_chain_id: dest_id,
            send_signal_reward_block_hash: reward_sent_hash.0.clone(),
            amount,
        }),
    ))?;

    let credit_hash = src.append(Block::new(
        BlockHeader::pending(BlockKind::CreditAccepted, ts, amount),
        BlockPayload::CreditAccepted(CreditAcceptedPayload {
            ref_block_hash: reward_received_hash.0.clone(),
        }),
    ))?;

    tracing::debug!(
        src = %src.uuid,
        dest = %dest.uuid,
        amount = %amount,
        delivered = delivered_hash.is_some(),
        "signal exchange complete"
    );

    Ok(SignalOutcome {
        sent_hash,
        received_hash,
        delivered_hash,
        reward_sent_hash,
        reward_received_hash,
        credit_hash,
    })
}
