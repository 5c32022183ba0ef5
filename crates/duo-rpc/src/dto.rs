//! Request/response shapes for the HTTP surface (§6.3). Each request DTO
//! mirrors one block variant's caller-supplied fields; everything else
//! (`block_hash`, `prev_block_hash`, `height`, `balance`) is computed by
//! `Chain::append` and never accepted from a client.

use std::collections::BTreeMap;

use duo_chain::{AttrQuery, PeerCredibility, ValueType};
use duo_core::block::*;
use duo_core::{Amount, Block, BlockKind, ChainId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Chain lifecycle / query ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitChainRequest {
    pub seed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChainSummary {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "BlockType")]
    pub block_type: &'static str,
    #[serde(rename = "HeadHash")]
    pub head_hash: String,
    #[serde(rename = "Balance")]
    pub balance: String,
    #[serde(rename = "BlockHeight")]
    pub block_height: u64,
    #[serde(rename = "Blocks")]
    pub blocks: Vec<Value>,
}

impl ChainSummary {
    pub fn of(chain: &duo_chain::Chain, include_blocks: bool) -> Self {
        let stats = chain.get_stats();
        Self {
            id: chain.uuid.as_str().to_string(),
            block_type: "Chain",
            head_hash: chain.head_hash().0,
            balance: stats.balance.to_string(),
            block_height: chain.height(),
            blocks: if include_blocks {
                chain.blocks.iter().map(Block::to_json).collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "ErrorMessage")]
    pub error_message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { success: true, error_message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttrQueryDto {
    pub key: String,
    pub subkey: Option<String>,
    pub value: Value,
    pub value_type: ValueTypeDto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTypeDto {
    Str,
    Int,
    Decimal,
    Dict,
}

impl From<ValueTypeDto> for ValueType {
    fn from(v: ValueTypeDto) -> Self {
        match v {
            ValueTypeDto::Str => ValueType::Str,
            ValueTypeDto::Int => ValueType::Int,
            ValueTypeDto::Decimal => ValueType::Decimal,
            ValueTypeDto::Dict => ValueType::Dict,
        }
    }
}

impl AttrQueryDto {
    pub fn into_attr_query(self) -> AttrQuery {
        let path = match self.subkey {
            Some(sub) => format!("{}.{}", self.key, sub),
            None => self.key,
        };
        AttrQuery {
            path,
            value: self.value,
            value_type: self.value_type.into(),
        }
    }
}

/// `block_type` accepts either a single tag or a list, matching the Python
/// model's `int | list[int]` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BlockTypeFilter {
    One(u32),
    Many(Vec<u32>),
}

impl BlockTypeFilter {
    pub fn into_kinds(self) -> Result<Vec<BlockKind>, String> {
        let raw = match self {
            BlockTypeFilter::One(n) => vec![n],
            BlockTypeFilter::Many(ns) => ns,
        };
        raw.into_iter()
            .map(|n| BlockKind::from_u32(n).ok_or_else(|| format!("unknown block_type {n}")))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockQueryRequest {
    pub block_type: BlockTypeFilter,
    pub attr_query: Option<AttrQueryDto>,
    #[serde(default)]
    pub multiple: bool,
    pub window_far: Option<i64>,
    pub window_near: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BlockMutationRequest {
    pub block: Value,
}

#[derive(Debug, Serialize)]
pub struct CredibilityEntry {
    pub debit: String,
    pub credit: String,
    pub balance: String,
    pub mining_credit: String,
    pub total_verified: String,
    pub total_other_verified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<String>>,
}

impl CredibilityEntry {
    pub fn of(c: &PeerCredibility, minimal: bool) -> Self {
        Self {
            debit: c.debit.to_string(),
            credit: c.credit.to_string(),
            balance: c.balance.to_string(),
            mining_credit: c.mining_credit.to_string(),
            total_verified: c.total_verified.to_string(),
            total_other_verified: c.total_other_verified.to_string(),
            blocks: if minimal {
                None
            } else {
                Some(c.blocks.iter().map(|h| h.0.clone()).collect())
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub service_name: &'static str,
    pub chains: usize,
}

// ── Per-variant block-append requests ────────────────────────────────────────
// Every request carries only the fields a caller can legitimately choose;
// `dest_chain_id`/`src_chain_id` are plain strings, converted to `ChainId`.

#[derive(Debug, Deserialize)]
pub struct SendSignalRequest {
    pub dest_chain_id: String,
    #[serde(default)]
    pub signal_data: BTreeMap<String, Value>,
    pub amount: Option<Amount>,
}

impl SendSignalRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::SignalSent(SignalSentPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            signal_data: self.signal_data,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveSignalRequest {
    pub src_chain_id: String,
    pub send_signal_block_hash: String,
    #[serde(default)]
    pub signal_data: BTreeMap<String, Value>,
    pub amount: Option<Amount>,
}

impl ReceiveSignalRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::SignalReceived(SignalReceivedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            send_signal_block_hash: self.send_signal_block_hash,
            signal_data: self.signal_data,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeliverSignalRequest {
    pub src_chain_id: String,
    pub receive_signal_block_hash: String,
    pub activity_id: String,
    #[serde(default = "default_cost")]
    pub cost: i64,
    pub amount: Option<Amount>,
}

fn default_cost() -> i64 {
    1
}

impl DeliverSignalRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::SignalDelivered(SignalDeliveredPayload {
            src_chain_id: ChainId(self.src_chain_id),
            receive_signal_block_hash: self.receive_signal_block_hash,
            activity_id: self.activity_id,
            cost: self.cost,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendSignalRewardRequest {
    pub dest_chain_id: String,
    pub action_block_hash: Option<String>,
    pub deliver_signal_block_hash: String,
    pub amount: Amount,
    pub accepted_amount: Option<Amount>,
}

impl SendSignalRewardRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::SignalRewardSent(SignalRewardSentPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            action_block_hash: self.action_block_hash,
            deliver_signal_block_hash: self.deliver_signal_block_hash,
            amount: self.amount,
            accepted_amount: self.accepted_amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveSignalRewardRequest {
    pub src_chain_id: String,
    pub send_signal_reward_block_hash: String,
    pub amount: Amount,
}

impl ReceiveSignalRewardRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::SignalRewardReceived(SignalRewardReceivedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            send_signal_reward_block_hash: self.send_signal_reward_block_hash,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub name: String,
    pub target_id: String,
    pub reward_per: Amount,
    pub reward_pool: Amount,
    #[serde(default)]
    pub priors: Value,
    #[serde(default)]
    pub conditions: Value,
}

impl TargetRequest {
    pub fn into_payload(self) -> Result<BlockPayload, String> {
        if self.reward_per <= Amount::ZERO || self.reward_pool <= Amount::ZERO {
            return Err("reward_per and reward_pool must be positive".into());
        }
        if self.reward_pool < self.reward_per {
            return Err("reward_pool must be at least reward_per".into());
        }
        if self.name.is_empty() || self.name.len() > 256 {
            return Err("name must be non-empty and at most 256 characters".into());
        }
        Ok(BlockPayload::TargetCreated(TargetCreatedPayload {
            name: self.name,
            target_id: self.target_id,
            reward_per: self.reward_per,
            reward_pool: self.reward_pool,
            priors: self.priors,
            conditions: self.conditions,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptTargetRequest {
    pub src_chain_id: String,
    pub target_id: String,
    pub target_block_hash: String,
    #[serde(default)]
    pub target_details: Value,
}

impl AcceptTargetRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::TargetAccepted(TargetAcceptedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            target_id: self.target_id,
            target_block_hash: self.target_block_hash,
            target_details: self.target_details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action_id: String,
    pub activity_id: String,
    #[serde(default)]
    pub refs: BTreeMap<String, std::collections::BTreeSet<String>>,
    pub action_ts: i64,
    pub deliver_signal_block_hash: Option<String>,
}

impl ActionRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::Action(ActionPayload {
            base: BaseAction {
                action_id: self.action_id,
                activity_id: self.activity_id,
                refs: self.refs,
                action_ts: self.action_ts,
            },
            deliver_signal_block_hash: self.deliver_signal_block_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkOutputRequest {
    pub action_id: String,
    pub activity_id: String,
    #[serde(default)]
    pub refs: BTreeMap<String, std::collections::BTreeSet<String>>,
    pub action_ts: i64,
    #[serde(default)]
    pub details: Value,
}

impl WorkOutputRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::WorkOutput(WorkOutputPayload {
            base: BaseAction {
                action_id: self.action_id,
                activity_id: self.activity_id,
                refs: self.refs,
                action_ts: self.action_ts,
            },
            details: self.details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendTargetRewardClaimRequest {
    pub dest_chain_id: String,
    pub target_block_hash: String,
    pub work_output_block_hash: String,
    #[serde(default)]
    pub work_output_details: Value,
}

impl SendTargetRewardClaimRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::TargetRewardClaimSent(TargetRewardClaimSentPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            target_block_hash: self.target_block_hash,
            work_output_block_hash: self.work_output_block_hash,
            work_output_details: self.work_output_details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveTargetRewardClaimRequest {
    pub src_chain_id: String,
    pub target_block_hash: String,
    pub send_target_reward_claim_block_hash: String,
    pub work_output_block_hash: String,
    #[serde(default)]
    pub work_output_details: Value,
}

impl ReceiveTargetRewardClaimRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::TargetRewardClaimReceived(TargetRewardClaimReceivedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            target_block_hash: self.target_block_hash,
            send_target_reward_claim_block_hash: self.send_target_reward_claim_block_hash,
            work_output_block_hash: self.work_output_block_hash,
            work_output_details: self.work_output_details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendTargetRewardRequest {
    pub dest_chain_id: String,
    pub target_block_hash: String,
    pub receive_target_reward_claim_block_hash: String,
    pub amount: Amount,
}

impl SendTargetRewardRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::TargetRewardSent(TargetRewardSentPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            target_block_hash: self.target_block_hash,
            receive_target_reward_claim_block_hash: self.receive_target_reward_claim_block_hash,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveTargetRewardRequest {
    pub src_chain_id: String,
    pub target_block_hash: String,
    pub send_target_reward_block_hash: String,
    pub amount: Amount,
}

impl ReceiveTargetRewardRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::TargetRewardReceived(TargetRewardReceivedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            target_block_hash: self.target_block_hash,
            send_target_reward_block_hash: self.send_target_reward_block_hash,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    pub amount: Amount,
    #[serde(default)]
    pub ref_block_hash: String,
}

impl DebitRequest {
    pub fn into_payload(self) -> Result<(BlockPayload, Amount), String> {
        if self.amount <= Amount::ZERO {
            return Err("amount must be positive".into());
        }
        let ref_block_hash = if self.ref_block_hash.is_empty() {
            String::new()
        } else {
            self.ref_block_hash
        };
        Ok((
            BlockPayload::Debit(DebitPayload { ref_block_hash }),
            -self.amount,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptCreditRequest {
    pub amount: Amount,
    #[serde(default)]
    pub ref_block_hash: String,
}

impl AcceptCreditRequest {
    pub fn into_payload(self) -> Result<(BlockPayload, Amount), String> {
        if self.amount <= Amount::ZERO {
            return Err("amount must be positive".into());
        }
        let ref_block_hash = if self.ref_block_hash.is_empty() {
            String::new()
        } else {
            self.ref_block_hash
        };
        Ok((
            BlockPayload::CreditAccepted(CreditAcceptedPayload { ref_block_hash }),
            self.amount,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreditRejectedRequest {
    pub amount: Amount,
    #[serde(default)]
    pub ref_block_hash: String,
}

impl CreditRejectedRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::CreditRejected(CreditRejectedPayload {
            amount: self.amount,
            ref_block_hash: self.ref_block_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendWorkOutputRewardRequest {
    pub dest_chain_id: String,
    pub amount: Amount,
    pub work_output_block_hash: String,
    #[serde(default)]
    pub details: Value,
}

impl SendWorkOutputRewardRequest {
    pub fn into_payload(self) -> Result<BlockPayload, String> {
        if self.amount <= Amount::ZERO {
            return Err("amount must be positive".into());
        }
        Ok(BlockPayload::WorkOutputRewardSent(WorkOutputRewardSentPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            amount: self.amount,
            work_output_block_hash: self.work_output_block_hash,
            details: self.details,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveWorkOutputRewardRequest {
    pub src_chain_id: String,
    pub amount: Amount,
    pub work_output_block_hash: String,
    pub send_work_output_reward_block_hash: String,
    #[serde(default)]
    pub details: Value,
}

impl ReceiveWorkOutputRewardRequest {
    pub fn into_payload(self) -> Result<BlockPayload, String> {
        if self.amount <= Amount::ZERO {
            return Err("amount must be positive".into());
        }
        Ok(BlockPayload::WorkOutputRewardReceived(WorkOutputRewardReceivedPayload {
            src_chain_id: ChainId(self.src_chain_id),
            amount: self.amount,
            work_output_block_hash: self.work_output_block_hash,
            send_work_output_reward_block_hash: self.send_work_output_reward_block_hash,
            details: self.details,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessContractOwnRequest {
    pub dest_chain_id: String,
    pub contract_amount: Amount,
    pub token: String,
    pub node_uuid: String,
    pub frame_uuid: String,
    pub expires_in: i64,
    pub min_price: Amount,
    #[serde(default)]
    pub details: Value,
}

impl AccessContractOwnRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::AccessContractOwn(AccessContractOwnPayload {
            dest_chain_id: ChainId(self.dest_chain_id),
            contract_amount: self.contract_amount,
            token: self.token,
            node_uuid: self.node_uuid,
            frame_uuid: self.frame_uuid,
            expires_in: self.expires_in,
            min_price: self.min_price,
            details: self.details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessContractOtherRequest {
    pub src_chain_id: String,
    pub access_contract_block_hash: String,
    pub contract_amount: Amount,
    pub token: String,
    pub contract_ts: i64,
    pub expires_in: i64,
    pub min_price: Amount,
    #[serde(default)]
    pub details: Value,
}

impl AccessContractOtherRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::AccessContractOther(AccessContractOtherPayload {
            src_chain_id: ChainId(self.src_chain_id),
            access_contract_block_hash: self.access_contract_block_hash,
            contract_amount: self.contract_amount,
            token: self.token,
            contract_ts: self.contract_ts,
            expires_in: self.expires_in,
            min_price: self.min_price,
            details: self.details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessContractOtherEventOpenRequest {
    pub access_contract_block_hash: String,
    pub other_access_contract_block_hash: String,
    pub amount: Amount,
    #[serde(default)]
    pub details: Value,
}

impl AccessContractOtherEventOpenRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::AccessContractOtherEventOpen(AccessContractOtherEventOpenPayload {
            access_contract_block_hash: self.access_contract_block_hash,
            other_access_contract_block_hash: self.other_access_contract_block_hash,
            amount: self.amount,
            details: self.details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessContractOwnEventAskRequest {
    pub access_contract_block_hash: String,
    pub other_event_open_block_hash: String,
    pub receive_signal_block_hash: String,
    pub amount: Amount,
    #[serde(default)]
    pub details: Value,
}

impl AccessContractOwnEventAskRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::AccessContractOwnEventAsk(AccessContractOwnEventAskPayload {
            access_contract_block_hash: self.access_contract_block_hash,
            other_event_open_block_hash: self.other_event_open_block_hash,
            receive_signal_block_hash: self.receive_signal_block_hash,
            amount: self.amount,
            details: self.details,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessContractOtherEventCloseRequest {
    pub access_contract_block_hash: String,
    pub other_access_contract_block_hash: String,
    pub access_contract_event_block_hash: String,
    pub other_access_contract_event_block_hash: String,
    pub receive_signal_reward_block_hash: String,
}

impl AccessContractOtherEventCloseRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::AccessContractOtherEventClose(AccessContractOtherEventClosePayload {
            access_contract_block_hash: self.access_contract_block_hash,
            other_access_contract_block_hash: self.other_access_contract_block_hash,
            access_contract_event_block_hash: self.access_contract_event_block_hash,
            other_access_contract_event_block_hash: self.other_access_contract_event_block_hash,
            receive_signal_reward_block_hash: self.receive_signal_reward_block_hash,
        })
    }
}

// ── Meta (§3.3) ──────────────────────────────────────────────────────────────
// `Reset`/`Upgrade` carry no payload fields beyond the common header; the
// request body exists only so the route accepts a JSON body uniformly with
// every other append endpoint.

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {}

impl ResetRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::Reset
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpgradeRequest {}

impl UpgradeRequest {
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload::Upgrade
    }
}
