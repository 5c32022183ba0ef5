//! The closed block-variant family (§3.3) and canonical hashing (§4.1).
//!
//! Each variant owns its payload fields, its JSON field names, and its
//! appendix to the hash input. `Block` glues a common header to one of
//! these payloads and is the unit the chain appends, persists, and verifies.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::DuoError;
use crate::hash::{bool_str, dec_str, is_amount, opt_dec_str, opt_str, sha256_concat};
use crate::types::{Amount, BlockHash, ChainId, Timestamp};

/// Stable wire tags (§6.1). `Null` is a sentinel for the empty chain and is
/// never stored; `Credit` (21) is reserved but has no constructible payload
/// in either this implementation or the system it was modeled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum BlockKind {
    Null = 0,
    SignalSent = 1,
    SignalReceived = 2,
    SignalDelivered = 3,
    SignalRewardSent = 4,
    SignalRewardReceived = 5,
    Action = 10,
    WorkOutput = 11,
    Debit = 20,
    CreditAccepted = 22,
    CreditRejected = 23,
    TargetCreated = 30,
    TargetAccepted = 31,
    TargetRewardClaimSent = 32,
    TargetRewardClaimReceived = 33,
    TargetRewardSent = 34,
    TargetRewardReceived = 35,
    WorkOutputRewardSent = 40,
    WorkOutputRewardReceived = 41,
    AccessContractOwn = 50,
    AccessContractOther = 51,
    AccessContractOtherEventOpen = 52,
    AccessContractOwnEventAsk = 53,
    AccessContractOtherEventClose = 54,
    VerificationOpen = 80,
    Verification = 81,
    VerificationClose = 82,
    Reset = 100,
    Upgrade = 101,
}

impl BlockKind {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        use BlockKind::*;
        Some(match v {
            0 => Null,
            1 => SignalSent,
            2 => SignalReceived,
            3 => SignalDelivered,
            4 => SignalRewardSent,
            5 => SignalRewardReceived,
            10 => Action,
            11 => WorkOutput,
            20 => Debit,
            22 => CreditAccepted,
            23 => CreditRejected,
            30 => TargetCreated,
            31 => TargetAccepted,
            32 => TargetRewardClaimSent,
            33 => TargetRewardClaimReceived,
            34 => TargetRewardSent,
            35 => TargetRewardReceived,
            40 => WorkOutputRewardSent,
            41 => WorkOutputRewardReceived,
            50 => AccessContractOwn,
            51 => AccessContractOther,
            52 => AccessContractOtherEventOpen,
            53 => AccessContractOwnEventAsk,
            54 => AccessContractOtherEventClose,
            80 => VerificationOpen,
            81 => Verification,
            82 => VerificationClose,
            100 => Reset,
            101 => Upgrade,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use BlockKind::*;
        match self {
            Null => "Null",
            SignalSent => "SignalSent",
            SignalReceived => "SignalReceived",
            SignalDelivered => "SignalDelivered",
            SignalRewardSent => "SignalRewardSent",
            SignalRewardReceived => "SignalRewardReceived",
            Action => "Action",
            WorkOutput => "WorkOutput",
            Debit => "Debit",
            CreditAccepted => "CreditAccepted",
            CreditRejected => "CreditRejected",
            TargetCreated => "TargetCreated",
            TargetAccepted => "TargetAccepted",
            TargetRewardClaimSent => "TargetRewardClaimSent",
            TargetRewardClaimReceived => "TargetRewardClaimReceived",
            TargetRewardSent => "TargetRewardSent",
            TargetRewardReceived => "TargetRewardReceived",
            WorkOutputRewardSent => "WorkOutputRewardSent",
            WorkOutputRewardReceived => "WorkOutputRewardReceived",
            AccessContractOwn => "AccessContractOwn",
            AccessContractOther => "AccessContractOther",
            AccessContractOtherEventOpen => "AccessContractOtherEventOpen",
            AccessContractOwnEventAsk => "AccessContractOwnEventAsk",
            AccessContractOtherEventClose => "AccessContractOtherEventClose",
            VerificationOpen => "VerificationOpen",
            Verification => "Verification",
            VerificationClose => "VerificationClose",
            Reset => "Reset",
            Upgrade => "Upgrade",
        }
    }
}

// ── Common header ────────────────────────────────────────────────────────────

/// Fields every block carries (§3.2). `block_hash`/`prev_block_hash` are
/// empty strings before a block is appended to a chain.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    pub block_type: u32,
    pub block_hash: BlockHash,
    pub prev_block_hash: String,
    pub height: u64,
    pub ts: Timestamp,
    pub balance: Amount,
    pub balance_delta: Amount,
}

impl BlockHeader {
    /// A header for a block not yet appended: no hash, no linkage, no
    /// height — `Chain::append` fills these in.
    pub fn pending(block_type: BlockKind, ts: Timestamp, balance_delta: Amount) -> Self {
        Self {
            block_type: block_type.as_u32(),
            block_hash: BlockHash(String::new()),
            prev_block_hash: String::new(),
            height: 0,
            ts,
            balance: Amount::ZERO,
            balance_delta,
        }
    }

    fn prefix_hashable(&self) -> Vec<String> {
        vec![
            self.block_type.to_string(),
            self.prev_block_hash.clone(),
            self.height.to_string(),
            self.ts.to_string(),
            dec_str(self.balance),
            dec_str(self.balance_delta),
        ]
    }

    fn to_json(&self, map: &mut Map<String, Value>) {
        map.insert("block_type".into(), Value::from(self.block_type));
        map.insert("block_hash".into(), Value::from(self.block_hash.0.clone()));
        map.insert(
            "prev_block_hash".into(),
            Value::from(self.prev_block_hash.clone()),
        );
        map.insert("height".into(), Value::from(self.height));
        map.insert("ts".into(), Value::from(self.ts));
        map.insert("balance".into(), Value::from(dec_str(self.balance)));
        map.insert(
            "balance_delta".into(),
            Value::from(dec_str(self.balance_delta)),
        );
    }

    fn from_json(v: &Value) -> Result<Self, DuoError> {
        let block_type = req_u32(v, "block_type")?;
        let block_hash = req_str(v, "block_hash")?;
        let prev_block_hash = req_str(v, "prev_block_hash")?;
        let height = req_u32(v, "height")? as u64;
        let ts = req_i64(v, "ts")?;
        let balance = req_decimal(v, "balance")?;
        let balance_delta = req_decimal(v, "balance_delta")?;
        Ok(Self {
            block_type,
            block_hash: BlockHash(block_hash),
            prev_block_hash,
            height,
            ts,
            balance,
            balance_delta,
        })
    }
}

// ── JSON helpers ─────────────────────────────────────────────────────────────
// Hand-rolled rather than derived: the wire format is a flat object keyed by
// the variant's own field names with an integer `block_type` discriminant,
// which does not map onto serde's internally-tagged-enum support.

fn req_str(v: &Value, key: &str) -> Result<String, DuoError> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DuoError::InvariantViolation(format!("missing field `{key}`")))
}

fn opt_str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn req_u32(v: &Value, key: &str) -> Result<u32, DuoError> {
    v.get(key)
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .ok_or_else(|| DuoError::InvariantViolation(format!("missing field `{key}`")))
}

fn req_i64(v: &Value, key: &str) -> Result<i64, DuoError> {
    v.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| DuoError::InvariantViolation(format!("missing field `{key}`")))
}

fn req_decimal(v: &Value, key: &str) -> Result<Amount, DuoError> {
    let s = req_str(v, key)?;
    s.parse::<Amount>()
        .map_err(|e| DuoError::InvariantViolation(format!("bad decimal in `{key}`: {e}")))
}

fn opt_decimal(v: &Value, key: &str) -> Option<Amount> {
    match v.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => s.parse::<Amount>().ok(),
        _ => None,
    }
}

/// `signal_data` is written by some variants as an embedded object and by
/// others as a JSON string-of-object (§6.2); accept both on the way in.
fn parse_dict_field(v: &Value, key: &str) -> BTreeMap<String, Value> {
    match v.get(key) {
        Some(Value::Object(m)) => m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .map(|m| m.into_iter().collect())
            .unwrap_or_default(),
        _ => BTreeMap::new(),
    }
}

fn parse_refs_field(v: &Value) -> BTreeMap<String, BTreeSet<String>> {
    let raw = match v.get("refs") {
        Some(Value::Object(m)) => m.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(m)) => m,
            _ => return BTreeMap::new(),
        },
        _ => return BTreeMap::new(),
    };

    raw.into_iter()
        .map(|(k, v)| {
            let set = match v {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect(),
                _ => BTreeSet::new(),
            };
            (k, set)
        })
        .collect()
}

fn dict_to_json(m: &BTreeMap<String, Value>) -> Value {
    Value::Object(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn refs_to_json(m: &BTreeMap<String, BTreeSet<String>>) -> Value {
    Value::Object(
        m.iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    Value::Array(v.iter().map(|s| Value::from(s.clone())).collect()),
                )
            })
            .collect(),
    )
}

/// Best-effort stringification of a `signal_data` value for hashing: the
/// protocol expects string-valued entries (booleans rendered specially); any
/// other JSON shape falls back to its compact JSON form rather than panicking.
fn value_hash_str(v: &Value) -> String {
    match v {
        Value::Bool(b) => bool_str(*b),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn sorted_dict_hashable(m: &BTreeMap<String, Value>, out: &mut Vec<String>) {
    for (k, v) in m {
        out.push(k.clone());
        out.push(value_hash_str(v));
    }
}

fn sorted_refs_hashable(m: &BTreeMap<String, BTreeSet<String>>, out: &mut Vec<String>) {
    for (k, members) in m {
        out.push(k.clone());
        let joined = members.iter().cloned().collect::<Vec<_>>().join(".");
        out.push(joined);
    }
}

// ── BaseAction shared fields (Action, WorkOutput) ────────────────────────────

#[derive(Clone, Debug)]
pub struct BaseAction {
    pub action_id: String,
    pub activity_id: String,
    pub refs: BTreeMap<String, BTreeSet<String>>,
    pub action_ts: Timestamp,
}

impl BaseAction {
    fn to_json(&self, map: &mut Map<String, Value>) {
        map.insert("action_id".into(), Value::from(self.action_id.clone()));
        map.insert(
            "activity_id".into(),
            Value::from(self.activity_id.clone()),
        );
        map.insert("action_ts".into(), Value::from(self.action_ts.to_string()));
        map.insert("refs".into(), refs_to_json(&self.refs));
    }

    fn from_json(v: &Value) -> Result<Self, DuoError> {
        Ok(Self {
            action_id: req_str(v, "action_id")?,
            activity_id: req_str(v, "activity_id")?,
            action_ts: req_i64(v, "action_ts")?,
            refs: parse_refs_field(v),
        })
    }

    fn hashable(&self, out: &mut Vec<String>) {
        out.push(self.action_id.clone());
        out.push(self.activity_id.clone());
        out.push(self.action_ts.to_string());
        sorted_refs_hashable(&self.refs, out);
    }
}

// ── Per-variant payloads ─────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct SignalSentPayload {
    pub dest_chain_id: ChainId,
    pub signal_data: BTreeMap<String, Value>,
    pub amount: Option<Amount>,
}

#[derive(Clone, Debug)]
pub struct SignalReceivedPayload {
    pub src_chain_id: ChainId,
    pub send_signal_block_hash: String,
    pub signal_data: BTreeMap<String, Value>,
    pub amount: Option<Amount>,
}

#[derive(Clone, Debug)]
pub struct SignalDeliveredPayload {
    pub src_chain_id: ChainId,
    pub receive_signal_block_hash: String,
    pub activity_id: String,
    pub cost: i64,
    pub amount: Option<Amount>,
}

#[derive(Clone, Debug)]
pub struct SignalRewardSentPayload {
    pub dest_chain_id: ChainId,
    pub action_block_hash: Option<String>,
    pub deliver_signal_block_hash: String,
    pub amount: Amount,
    pub accepted_amount: Option<Amount>,
}

#[derive(Clone, Debug)]
pub struct SignalRewardReceivedPayload {
    pub src_chain_id: ChainId,
    pub send_signal_reward_block_hash: String,
    pub amount: Amount,
}

#[derive(Clone, Debug)]
pub struct ActionPayload {
    pub base: BaseAction,
    pub deliver_signal_block_hash: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WorkOutputPayload {
    pub base: BaseAction,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct DebitPayload {
    pub ref_block_hash: String,
}

#[derive(Clone, Debug)]
pub struct CreditAcceptedPayload {
    pub ref_block_hash: String,
}

#[derive(Clone, Debug)]
pub struct CreditRejectedPayload {
    pub amount: Amount,
    pub ref_block_hash: String,
}

#[derive(Clone, Debug)]
pub struct TargetCreatedPayload {
    pub name: String,
    pub target_id: String,
    pub reward_per: Amount,
    pub reward_pool: Amount,
    pub priors: Value,
    pub conditions: Value,
}

#[derive(Clone, Debug)]
pub struct TargetAcceptedPayload {
    pub src_chain_id: ChainId,
    pub target_id: String,
    pub target_block_hash: String,
    pub target_details: Value,
}

#[derive(Clone, Debug)]
pub struct TargetRewardClaimSentPayload {
    pub dest_chain_id: ChainId,
    pub target_block_hash: String,
    pub work_output_block_hash: String,
    pub work_output_details: Value,
}

#[derive(Clone, Debug)]
pub struct TargetRewardClaimReceivedPayload {
    pub src_chain_id: ChainId,
    pub target_block_hash: String,
    pub send_target_reward_claim_block_hash: String,
    pub work_output_block_hash: String,
    pub work_output_details: Value,
}

#[derive(Clone, Debug)]
pub struct TargetRewardSentPayload {
    pub dest_chain_id: ChainId,
    pub target_block_hash: String,
    pub receive_target_reward_claim_block_hash: String,
    pub amount: Amount,
}

#[derive(Clone, Debug)]
pub struct TargetRewardReceivedPayload {
    pub src_chain_id: ChainId,
    pub target_block_hash: String,
    pub send_target_reward_block_hash: String,
    pub amount: Amount,
}

#[derive(Clone, Debug)]
pub struct WorkOutputRewardSentPayload {
    pub dest_chain_id: ChainId,
    pub amount: Amount,
    pub work_output_block_hash: String,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct WorkOutputRewardReceivedPayload {
    pub src_chain_id: ChainId,
    pub amount: Amount,
    pub work_output_block_hash: String,
    pub send_work_output_reward_block_hash: String,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct AccessContractOwnPayload {
    pub dest_chain_id: ChainId,
    pub contract_amount: Amount,
    pub token: String,
    pub node_uuid: String,
    pub frame_uuid: String,
    pub expires_in: i64,
    pub min_price: Amount,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct AccessContractOtherPayload {
    pub src_chain_id: ChainId,
    pub access_contract_block_hash: String,
    pub contract_amount: Amount,
    pub token: String,
    pub contract_ts: Timestamp,
    pub expires_in: i64,
    pub min_price: Amount,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct AccessContractOtherEventOpenPayload {
    pub access_contract_block_hash: String,
    pub other_access_contract_block_hash: String,
    pub amount: Amount,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct AccessContractOwnEventAskPayload {
    pub access_contract_block_hash: String,
    pub other_event_open_block_hash: String,
    pub receive_signal_block_hash: String,
    pub amount: Amount,
    pub details: Value,
}

#[derive(Clone, Debug)]
pub struct AccessContractOtherEventClosePayload {
    pub access_contract_block_hash: String,
    pub other_access_contract_block_hash: String,
    pub access_contract_event_block_hash: String,
    pub other_access_contract_event_block_hash: String,
    pub receive_signal_reward_block_hash: String,
}

#[derive(Clone, Debug)]
pub struct VerificationOpenPayload {
    pub dest_chain_id: ChainId,
}

#[derive(Clone, Debug)]
pub struct VerificationPayload {
    pub src_chain_id: ChainId,
    pub prev_verification_block_hash: Option<String>,
    pub other_verification_block_hash: Option<String>,
    pub chain_length: u64,
    pub sub_chain_balance: Amount,
    pub sub_chain_length: u64,
    pub sub_chain_hash: String,
    pub full_verification: bool,
}

#[derive(Clone, Debug)]
pub struct VerificationClosePayload {
    pub dest_chain_id: ChainId,
    pub open_verification_block_hash: String,
    pub other_verification_block_hash: String,
    pub chain_length: u64,
    pub sub_chain_balance: Amount,
    pub sub_chain_length: u64,
    pub sub_chain_hash: String,
    pub full_verification: bool,
}

/// The payload half of a block: everything beyond the common header.
#[derive(Clone, Debug)]
pub enum BlockPayload {
    SignalSent(SignalSentPayload),
    SignalReceived(SignalReceivedPayload),
    SignalDelivered(SignalDeliveredPayload),
    SignalRewardSent(SignalRewardSentPayload),
    SignalRewardReceived(SignalRewardReceivedPayload),
    Action(ActionPayload),
    WorkOutput(WorkOutputPayload),
    Debit(DebitPayload),
    CreditAccepted(CreditAcceptedPayload),
    CreditRejected(CreditRejectedPayload),
    TargetCreated(TargetCreatedPayload),
    TargetAccepted(TargetAcceptedPayload),
    TargetRewardClaimSent(TargetRewardClaimSentPayload),
    TargetRewardClaimReceived(TargetRewardClaimReceivedPayload),
    TargetRewardSent(TargetRewardSentPayload),
    TargetRewardReceived(TargetRewardReceivedPayload),
    WorkOutputRewardSent(WorkOutputRewardSentPayload),
    WorkOutputRewardReceived(WorkOutputRewardReceivedPayload),
    AccessContractOwn(AccessContractOwnPayload),
    AccessContractOther(AccessContractOtherPayload),
    AccessContractOtherEventOpen(AccessContractOtherEventOpenPayload),
    AccessContractOwnEventAsk(AccessContractOwnEventAskPayload),
    AccessContractOtherEventClose(AccessContractOtherEventClosePayload),
    VerificationOpen(VerificationOpenPayload),
    Verification(VerificationPayload),
    VerificationClose(VerificationClosePayload),
    Reset,
    Upgrade,
}

impl BlockPayload {
    pub fn kind(&self) -> BlockKind {
        use BlockPayload::*;
        match self {
            SignalSent(_) => BlockKind::SignalSent,
            SignalReceived(_) => BlockKind::SignalReceived,
            SignalDelivered(_) => BlockKind::SignalDelivered,
            SignalRewardSent(_) => BlockKind::SignalRewardSent,
            SignalRewardReceived(_) => BlockKind::SignalRewardReceived,
            Action(_) => BlockKind::Action,
            WorkOutput(_) => BlockKind::WorkOutput,
            Debit(_) => BlockKind::Debit,
            CreditAccepted(_) => BlockKind::CreditAccepted,
            CreditRejected(_) => BlockKind::CreditRejected,
            TargetCreated(_) => BlockKind::TargetCreated,
            TargetAccepted(_) => BlockKind::TargetAccepted,
            TargetRewardClaimSent(_) => BlockKind::TargetRewardClaimSent,
            TargetRewardClaimReceived(_) => BlockKind::TargetRewardClaimReceived,
            TargetRewardSent(_) => BlockKind::TargetRewardSent,
            TargetRewardReceived(_) => BlockKind::TargetRewardReceived,
            WorkOutputRewardSent(_) => BlockKind::WorkOutputRewardSent,
            WorkOutputRewardReceived(_) => BlockKind::WorkOutputRewardReceived,
            AccessContractOwn(_) => BlockKind::AccessContractOwn,
            AccessContractOther(_) => BlockKind::AccessContractOther,
            AccessContractOtherEventOpen(_) => BlockKind::AccessContractOtherEventOpen,
            AccessContractOwnEventAsk(_) => BlockKind::AccessContractOwnEventAsk,
            AccessContractOtherEventClose(_) => BlockKind::AccessContractOtherEventClose,
            VerificationOpen(_) => BlockKind::VerificationOpen,
            Verification(_) => BlockKind::Verification,
            VerificationClose(_) => BlockKind::VerificationClose,
            Reset => BlockKind::Reset,
            Upgrade => BlockKind::Upgrade,
        }
    }

    fn append_hashable(&self, out: &mut Vec<String>) {
        use BlockPayload::*;
        match self {
            SignalSent(p) => {
                out.push(p.dest_chain_id.to_string());
                sorted_dict_hashable(&p.signal_data, out);
                if is_amount(p.amount) {
                    out.push(dec_str(p.amount.unwrap()));
                }
            }
            SignalReceived(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.send_signal_block_hash.clone());
                sorted_dict_hashable(&p.signal_data, out);
                if is_amount(p.amount) {
                    out.push(dec_str(p.amount.unwrap()));
                }
            }
            SignalDelivered(p) => {
                out.push(p.activity_id.clone());
                out.push(p.src_chain_id.to_string());
                out.push(p.receive_signal_block_hash.clone());
                out.push(p.cost.to_string());
                out.push(opt_dec_str(p.amount));
            }
            SignalRewardSent(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(opt_str(&p.action_block_hash));
                out.push(p.deliver_signal_block_hash.clone());
                out.push(dec_str(p.amount));
                out.push(opt_dec_str(p.accepted_amount));
            }
            SignalRewardReceived(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.send_signal_reward_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            Action(p) => {
                p.base.hashable(out);
                out.push(opt_str(&p.deliver_signal_block_hash));
            }
            WorkOutput(p) => {
                p.base.hashable(out);
            }
            Debit(p) => out.push(p.ref_block_hash.clone()),
            CreditAccepted(p) => out.push(p.ref_block_hash.clone()),
            CreditRejected(p) => {
                out.push(p.ref_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            TargetCreated(p) => {
                out.push(p.name.clone());
                out.push(p.target_id.clone());
                out.push(dec_str(p.reward_per));
                out.push(dec_str(p.reward_pool));
            }
            TargetAccepted(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.target_id.clone());
                out.push(p.target_block_hash.clone());
            }
            TargetRewardClaimSent(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(p.target_block_hash.clone());
                out.push(p.work_output_block_hash.clone());
            }
            TargetRewardClaimReceived(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.target_block_hash.clone());
                out.push(p.send_target_reward_claim_block_hash.clone());
                out.push(p.work_output_block_hash.clone());
            }
            TargetRewardSent(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(p.target_block_hash.clone());
                out.push(p.receive_target_reward_claim_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            TargetRewardReceived(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.target_block_hash.clone());
                out.push(p.send_target_reward_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            WorkOutputRewardSent(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(dec_str(p.amount));
                out.push(p.work_output_block_hash.clone());
            }
            WorkOutputRewardReceived(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(dec_str(p.amount));
                out.push(p.work_output_block_hash.clone());
                out.push(p.send_work_output_reward_block_hash.clone());
            }
            AccessContractOwn(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(dec_str(p.contract_amount));
                out.push(p.token.clone());
                out.push(p.node_uuid.clone());
                out.push(p.frame_uuid.clone());
                out.push(p.expires_in.to_string());
                out.push(dec_str(p.min_price));
            }
            AccessContractOther(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(p.access_contract_block_hash.clone());
                out.push(dec_str(p.contract_amount));
                out.push(p.token.clone());
                out.push(p.expires_in.to_string());
                out.push(p.contract_ts.to_string());
                out.push(dec_str(p.min_price));
            }
            AccessContractOtherEventOpen(p) => {
                out.push(p.access_contract_block_hash.clone());
                out.push(p.other_access_contract_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            AccessContractOwnEventAsk(p) => {
                out.push(p.access_contract_block_hash.clone());
                out.push(p.other_event_open_block_hash.clone());
                out.push(p.receive_signal_block_hash.clone());
                out.push(dec_str(p.amount));
            }
            AccessContractOtherEventClose(p) => {
                out.push(p.access_contract_block_hash.clone());
                out.push(p.other_access_contract_block_hash.clone());
                out.push(p.access_contract_event_block_hash.clone());
                out.push(p.other_access_contract_event_block_hash.clone());
                out.push(p.receive_signal_reward_block_hash.clone());
            }
            VerificationOpen(p) => out.push(p.dest_chain_id.to_string()),
            Verification(p) => {
                out.push(p.src_chain_id.to_string());
                out.push(opt_str(&p.prev_verification_block_hash));
                out.push(opt_str(&p.other_verification_block_hash));
                out.push(p.chain_length.to_string());
                out.push(dec_str(p.sub_chain_balance));
                out.push(p.sub_chain_length.to_string());
                out.push(p.sub_chain_hash.clone());
                out.push(bool_str(p.full_verification));
            }
            VerificationClose(p) => {
                out.push(p.dest_chain_id.to_string());
                out.push(p.open_verification_block_hash.clone());
                out.push(p.other_verification_block_hash.clone());
                out.push(p.chain_length.to_string());
                out.push(dec_str(p.sub_chain_balance));
                out.push(p.sub_chain_length.to_string());
                out.push(p.sub_chain_hash.clone());
                out.push(bool_str(p.full_verification));
            }
            Reset | Upgrade => {}
        }
    }

    fn to_json_fields(&self, map: &mut Map<String, Value>) {
        use BlockPayload::*;
        match self {
            SignalSent(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert("signal_data".into(), dict_to_json(&p.signal_data));
                map.insert(
                    "amount".into(),
                    p.amount.map(dec_str).map(Value::from).unwrap_or(Value::Null),
                );
            }
            SignalReceived(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "send_signal_block_hash".into(),
                    Value::from(p.send_signal_block_hash.clone()),
                );
                let encoded = serde_json::to_string(&dict_to_json(&p.signal_data))
                    .unwrap_or_else(|_| "{}".to_string());
                map.insert("signal_data".into(), Value::from(encoded));
                map.insert(
                    "amount".into(),
                    p.amount.map(dec_str).map(Value::from).unwrap_or(Value::Null),
                );
            }
            SignalDelivered(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "receive_signal_block_hash".into(),
                    Value::from(p.receive_signal_block_hash.clone()),
                );
                map.insert("activity_id".into(), Value::from(p.activity_id.clone()));
                map.insert("cost".into(), Value::from(p.cost));
                map.insert(
                    "amount".into(),
                    p.amount.map(dec_str).map(Value::from).unwrap_or(Value::Null),
                );
            }
            SignalRewardSent(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert(
                    "deliver_signal_block_hash".into(),
                    Value::from(p.deliver_signal_block_hash.clone()),
                );
                map.insert(
                    "action_block_hash".into(),
                    p.action_block_hash.clone().map(Value::from).unwrap_or(Value::Null),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
                map.insert(
                    "accepted_amount".into(),
                    p.accepted_amount
                        .map(dec_str)
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                );
            }
            SignalRewardReceived(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "send_signal_reward_block_hash".into(),
                    Value::from(p.send_signal_reward_block_hash.clone()),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
            }
            Action(p) => {
                p.base.to_json(map);
                map.insert(
                    "deliver_signal_block_hash".into(),
                    p.deliver_signal_block_hash
                        .clone()
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                );
            }
            WorkOutput(p) => {
                p.base.to_json(map);
                map.insert("details".into(), p.details.clone());
            }
            Debit(p) => {
                map.insert("ref_block_hash".into(), Value::from(p.ref_block_hash.clone()));
            }
            CreditAccepted(p) => {
                map.insert("ref_block_hash".into(), Value::from(p.ref_block_hash.clone()));
            }
            CreditRejected(p) => {
                map.insert("ref_block_hash".into(), Value::from(p.ref_block_hash.clone()));
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
            }
            TargetCreated(p) => {
                map.insert("name".into(), Value::from(p.name.clone()));
                map.insert("target_id".into(), Value::from(p.target_id.clone()));
                map.insert("reward_per".into(), Value::from(dec_str(p.reward_per)));
                map.insert("reward_pool".into(), Value::from(dec_str(p.reward_pool)));
                map.insert("priors".into(), p.priors.clone());
                map.insert("conditions".into(), p.conditions.clone());
            }
            TargetAccepted(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert("target_id".into(), Value::from(p.target_id.clone()));
                map.insert(
                    "target_block_hash".into(),
                    Value::from(p.target_block_hash.clone()),
                );
                map.insert("target_details".into(), p.target_details.clone());
            }
            TargetRewardClaimSent(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert(
                    "target_block_hash".into(),
                    Value::from(p.target_block_hash.clone()),
                );
                map.insert(
                    "work_output_block_hash".into(),
                    Value::from(p.work_output_block_hash.clone()),
                );
                map.insert("work_output_details".into(), p.work_output_details.clone());
            }
            TargetRewardClaimReceived(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "target_block_hash".into(),
                    Value::from(p.target_block_hash.clone()),
                );
                map.insert(
                    "send_target_reward_claim_block_hash".into(),
                    Value::from(p.send_target_reward_claim_block_hash.clone()),
                );
                map.insert(
                    "work_output_block_hash".into(),
                    Value::from(p.work_output_block_hash.clone()),
                );
                map.insert("work_output_details".into(), p.work_output_details.clone());
            }
            TargetRewardSent(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert(
                    "target_block_hash".into(),
                    Value::from(p.target_block_hash.clone()),
                );
                map.insert(
                    "receive_target_reward_claim_block_hash".into(),
                    Value::from(p.receive_target_reward_claim_block_hash.clone()),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
            }
            TargetRewardReceived(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "target_block_hash".into(),
                    Value::from(p.target_block_hash.clone()),
                );
                map.insert(
                    "send_target_reward_block_hash".into(),
                    Value::from(p.send_target_reward_block_hash.clone()),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
            }
            WorkOutputRewardSent(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
                map.insert(
                    "work_output_block_hash".into(),
                    Value::from(p.work_output_block_hash.clone()),
                );
                map.insert("details".into(), p.details.clone());
            }
            WorkOutputRewardReceived(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
                map.insert(
                    "work_output_block_hash".into(),
                    Value::from(p.work_output_block_hash.clone()),
                );
                map.insert(
                    "send_work_output_reward_block_hash".into(),
                    Value::from(p.send_work_output_reward_block_hash.clone()),
                );
                map.insert("details".into(), p.details.clone());
            }
            AccessContractOwn(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert(
                    "contract_amount".into(),
                    Value::from(dec_str(p.contract_amount)),
                );
                map.insert("token".into(), Value::from(p.token.clone()));
                map.insert("node_uuid".into(), Value::from(p.node_uuid.clone()));
                map.insert("frame_uuid".into(), Value::from(p.frame_uuid.clone()));
                map.insert("expires_in".into(), Value::from(p.expires_in));
                map.insert("min_price".into(), Value::from(dec_str(p.min_price)));
                map.insert("details".into(), p.details.clone());
            }
            AccessContractOther(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "access_contract_block_hash".into(),
                    Value::from(p.access_contract_block_hash.clone()),
                );
                map.insert(
                    "contract_amount".into(),
                    Value::from(dec_str(p.contract_amount)),
                );
                map.insert("token".into(), Value::from(p.token.clone()));
                map.insert("expires_in".into(), Value::from(p.expires_in));
                map.insert("contract_ts".into(), Value::from(p.contract_ts));
                map.insert("min_price".into(), Value::from(dec_str(p.min_price)));
                map.insert("details".into(), p.details.clone());
            }
            AccessContractOtherEventOpen(p) => {
                map.insert(
                    "access_contract_block_hash".into(),
                    Value::from(p.access_contract_block_hash.clone()),
                );
                map.insert(
                    "other_access_contract_block_hash".into(),
                    Value::from(p.other_access_contract_block_hash.clone()),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
                map.insert("details".into(), p.details.clone());
            }
            AccessContractOwnEventAsk(p) => {
                map.insert(
                    "access_contract_block_hash".into(),
                    Value::from(p.access_contract_block_hash.clone()),
                );
                map.insert(
                    "other_event_open_block_hash".into(),
                    Value::from(p.other_event_open_block_hash.clone()),
                );
                map.insert(
                    "receive_signal_block_hash".into(),
                    Value::from(p.receive_signal_block_hash.clone()),
                );
                map.insert("amount".into(), Value::from(dec_str(p.amount)));
                map.insert("details".into(), p.details.clone());
            }
            AccessContractOtherEventClose(p) => {
                map.insert(
                    "access_contract_block_hash".into(),
                    Value::from(p.access_contract_block_hash.clone()),
                );
                map.insert(
                    "other_access_contract_block_hash".into(),
                    Value::from(p.other_access_contract_block_hash.clone()),
                );
                map.insert(
                    "access_contract_event_block_hash".into(),
                    Value::from(p.access_contract_event_block_hash.clone()),
                );
                map.insert(
                    "other_access_contract_event_block_hash".into(),
                    Value::from(p.other_access_contract_event_block_hash.clone()),
                );
                map.insert(
                    "receive_signal_reward_block_hash".into(),
                    Value::from(p.receive_signal_reward_block_hash.clone()),
                );
            }
            VerificationOpen(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
            }
            Verification(p) => {
                map.insert("src_chain_id".into(), Value::from(p.src_chain_id.0.clone()));
                map.insert(
                    "prev_verification_block_hash".into(),
                    p.prev_verification_block_hash
                        .clone()
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                );
                map.insert(
                    "other_verification_block_hash".into(),
                    p.other_verification_block_hash
                        .clone()
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                );
                map.insert(
                    "chain_length".into(),
                    Value::from(p.chain_length.to_string()),
                );
                map.insert(
                    "sub_chain_balance".into(),
                    Value::from(dec_str(p.sub_chain_balance)),
                );
                map.insert(
                    "sub_chain_length".into(),
                    Value::from(p.sub_chain_length.to_string()),
                );
                map.insert("sub_chain_hash".into(), Value::from(p.sub_chain_hash.clone()));
                map.insert(
                    "full_verification".into(),
                    Value::from(p.full_verification),
                );
            }
            VerificationClose(p) => {
                map.insert("dest_chain_id".into(), Value::from(p.dest_chain_id.0.clone()));
                map.insert(
                    "open_verification_block_hash".into(),
                    Value::from(p.open_verification_block_hash.clone()),
                );
                map.insert(
                    "other_verification_block_hash".into(),
                    Value::from(p.other_verification_block_hash.clone()),
                );
                map.insert(
                    "chain_length".into(),
                    Value::from(p.chain_length.to_string()),
                );
                map.insert(
                    "sub_chain_balance".into(),
                    Value::from(dec_str(p.sub_chain_balance)),
                );
                map.insert(
                    "sub_chain_length".into(),
                    Value::from(p.sub_chain_length.to_string()),
                );
                map.insert("sub_chain_hash".into(), Value::from(p.sub_chain_hash.clone()));
                map.insert(
                    "full_verification".into(),
                    Value::from(p.full_verification),
                );
            }
            Reset | Upgrade => {}
        }
    }

    fn from_json(kind: BlockKind, v: &Value) -> Result<Self, DuoError> {
        use BlockKind as K;
        Ok(match kind {
            K::Null => {
                return Err(DuoError::InvariantViolation(
                    "Null blocks are never stored".into(),
                ))
            }
            K::SignalSent => BlockPayload::SignalSent(SignalSentPayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                signal_data: parse_dict_field(v, "signal_data"),
                amount: opt_decimal(v, "amount"),
            }),
            K::SignalReceived => BlockPayload::SignalReceived(SignalReceivedPayload {
                src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                send_signal_block_hash: req_str(v, "send_signal_block_hash")?,
                signal_data: parse_dict_field(v, "signal_data"),
                amount: opt_decimal(v, "amount"),
            }),
            K::SignalDelivered => BlockPayload::SignalDelivered(SignalDeliveredPayload {
                src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                receive_signal_block_hash: req_str(v, "receive_signal_block_hash")?,
                activity_id: req_str(v, "activity_id")?,
                cost: v.get("cost").and_then(Value::as_i64).unwrap_or(1),
                amount: opt_decimal(v, "amount"),
            }),
            K::SignalRewardSent => BlockPayload::SignalRewardSent(SignalRewardSentPayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                action_block_hash: opt_str_field(v, "action_block_hash"),
                deliver_signal_block_hash: req_str(v, "deliver_signal_block_hash")?,
                amount: req_decimal(v, "amount")?,
                accepted_amount: opt_decimal(v, "accepted_amount"),
            }),
            K::SignalRewardReceived => {
                BlockPayload::SignalRewardReceived(SignalRewardReceivedPayload {
                    src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                    send_signal_reward_block_hash: req_str(v, "send_signal_reward_block_hash")?,
                    amount: req_decimal(v, "amount")?,
                })
            }
            K::Action => BlockPayload::Action(ActionPayload {
                base: BaseAction::from_json(v)?,
                deliver_signal_block_hash: opt_str_field(v, "deliver_signal_block_hash"),
            }),
            K::WorkOutput => BlockPayload::WorkOutput(WorkOutputPayload {
                base: BaseAction::from_json(v)?,
                details: v.get("details").cloned().unwrap_or(Value::Null),
            }),
            K::Debit => BlockPayload::Debit(DebitPayload {
                ref_block_hash: req_str(v, "ref_block_hash")?,
            }),
            K::CreditAccepted => BlockPayload::CreditAccepted(CreditAcceptedPayload {
                ref_block_hash: req_str(v, "ref_block_hash")?,
            }),
            K::CreditRejected => BlockPayload::CreditRejected(CreditRejectedPayload {
                ref_block_hash: req_str(v, "ref_block_hash")?,
                amount: req_decimal(v, "amount")?,
            }),
            K::TargetCreated => BlockPayload::TargetCreated(TargetCreatedPayload {
                name: req_str(v, "name")?,
                target_id: req_str(v, "target_id")?,
                reward_per: req_decimal(v, "reward_per")?,
                reward_pool: req_decimal(v, "reward_pool")?,
                priors: v.get("priors").cloned().unwrap_or(Value::Null),
                conditions: v.get("conditions").cloned().unwrap_or(Value::Null),
            }),
            K::TargetAccepted => BlockPayload::TargetAccepted(TargetAcceptedPayload {
                src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                target_id: req_str(v, "target_id")?,
                target_block_hash: req_str(v, "target_block_hash")?,
                target_details: v.get("target_details").cloned().unwrap_or(Value::Null),
            }),
            K::TargetRewardClaimSent => {
                BlockPayload::TargetRewardClaimSent(TargetRewardClaimSentPayload {
                    dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                    target_block_hash: req_str(v, "target_block_hash")?,
                    work_output_block_hash: req_str(v, "work_output_block_hash")?,
                    work_output_details: v
                        .get("work_output_details")
                        .cloned()
                        .unwrap_or(Value::Null),
                })
            }
            K::TargetRewardClaimReceived => {
                BlockPayload::TargetRewardClaimReceived(TargetRewardClaimReceivedPayload {
                    src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                    target_block_hash: req_str(v, "target_block_hash")?,
                    send_target_reward_claim_block_hash: req_str(
                        v,
                        "send_target_reward_claim_block_hash",
                    )?,
                    work_output_block_hash: req_str(v, "work_output_block_hash")?,
                    work_output_details: v
                        .get("work_output_details")
                        .cloned()
                        .unwrap_or(Value::Null),
                })
            }
            K::TargetRewardSent => BlockPayload::TargetRewardSent(TargetRewardSentPayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                target_block_hash: req_str(v, "target_block_hash")?,
                receive_target_reward_claim_block_hash: req_str(
                    v,
                    "receive_target_reward_claim_block_hash",
                )?,
                amount: req_decimal(v, "amount")?,
            }),
            K::TargetRewardReceived => {
                BlockPayload::TargetRewardReceived(TargetRewardReceivedPayload {
                    src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                    target_block_hash: req_str(v, "target_block_hash")?,
                    send_target_reward_block_hash: req_str(v, "send_target_reward_block_hash")?,
                    amount: req_decimal(v, "amount")?,
                })
            }
            K::WorkOutputRewardSent => {
                BlockPayload::WorkOutputRewardSent(WorkOutputRewardSentPayload {
                    dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                    amount: req_decimal(v, "amount")?,
                    work_output_block_hash: req_str(v, "work_output_block_hash")?,
                    details: v.get("details").cloned().unwrap_or(Value::Null),
                })
            }
            K::WorkOutputRewardReceived => {
                BlockPayload::WorkOutputRewardReceived(WorkOutputRewardReceivedPayload {
                    src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                    amount: req_decimal(v, "amount")?,
                    work_output_block_hash: req_str(v, "work_output_block_hash")?,
                    send_work_output_reward_block_hash: req_str(
                        v,
                        "send_work_output_reward_block_hash",
                    )?,
                    details: v.get("details").cloned().unwrap_or(Value::Null),
                })
            }
            K::AccessContractOwn => BlockPayload::AccessContractOwn(AccessContractOwnPayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                contract_amount: req_decimal(v, "contract_amount")?,
                token: req_str(v, "token")?,
                node_uuid: req_str(v, "node_uuid")?,
                frame_uuid: req_str(v, "frame_uuid")?,
                expires_in: req_i64(v, "expires_in")?,
                min_price: req_decimal(v, "min_price")?,
                details: v.get("details").cloned().unwrap_or(Value::Null),
            }),
            K::AccessContractOther => {
                BlockPayload::AccessContractOther(AccessContractOtherPayload {
                    src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                    access_contract_block_hash: req_str(v, "access_contract_block_hash")?,
                    contract_amount: req_decimal(v, "contract_amount")?,
                    token: req_str(v, "token")?,
                    contract_ts: req_i64(v, "contract_ts")?,
                    expires_in: req_i64(v, "expires_in")?,
                    min_price: req_decimal(v, "min_price")?,
                    details: v.get("details").cloned().unwrap_or(Value::Null),
                })
            }
            K::AccessContractOtherEventOpen => BlockPayload::AccessContractOtherEventOpen(
                AccessContractOtherEventOpenPayload {
                    access_contract_block_hash: req_str(v, "access_contract_block_hash")?,
                    other_access_contract_block_hash: req_str(
                        v,
                        "other_access_contract_block_hash",
                    )?,
                    amount: req_decimal(v, "amount")?,
                    details: v.get("details").cloned().unwrap_or(Value::Null),
                },
            ),
            K::AccessContractOwnEventAsk => {
                BlockPayload::AccessContractOwnEventAsk(AccessContractOwnEventAskPayload {
                    access_contract_block_hash: req_str(v, "access_contract_block_hash")?,
                    other_event_open_block_hash: req_str(v, "other_event_open_block_hash")?,
                    receive_signal_block_hash: req_str(v, "receive_signal_block_hash")?,
                    amount: req_decimal(v, "amount")?,
                    details: v.get("details").cloned().unwrap_or(Value::Null),
                })
            }
            K::AccessContractOtherEventClose => BlockPayload::AccessContractOtherEventClose(
                AccessContractOtherEventClosePayload {
                    access_contract_block_hash: req_str(v, "access_contract_block_hash")?,
                    other_access_contract_block_hash: req_str(
                        v,
                        "other_access_contract_block_hash",
                    )?,
                    access_contract_event_block_hash: req_str(
                        v,
                        "access_contract_event_block_hash",
                    )?,
                    other_access_contract_event_block_hash: req_str(
                        v,
                        "other_access_contract_event_block_hash",
                    )?,
                    receive_signal_reward_block_hash: req_str(
                        v,
                        "receive_signal_reward_block_hash",
                    )?,
                },
            ),
            K::VerificationOpen => BlockPayload::VerificationOpen(VerificationOpenPayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
            }),
            K::Verification => BlockPayload::Verification(VerificationPayload {
                src_chain_id: ChainId(req_str(v, "src_chain_id")?),
                prev_verification_block_hash: opt_str_field(v, "prev_verification_block_hash"),
                other_verification_block_hash: opt_str_field(v, "other_verification_block_hash"),
                chain_length: req_str(v, "chain_length")?
                    .parse()
                    .map_err(|_| DuoError::InvariantViolation("bad chain_length".into()))?,
                sub_chain_balance: req_decimal(v, "sub_chain_balance")?,
                sub_chain_length: req_str(v, "sub_chain_length")?
                    .parse()
                    .map_err(|_| DuoError::InvariantViolation("bad sub_chain_length".into()))?,
                sub_chain_hash: req_str(v, "sub_chain_hash")?,
                full_verification: v
                    .get("full_verification")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            K::VerificationClose => BlockPayload::VerificationClose(VerificationClosePayload {
                dest_chain_id: ChainId(req_str(v, "dest_chain_id")?),
                open_verification_block_hash: req_str(v, "open_verification_block_hash")?,
                other_verification_block_hash: req_str(v, "other_verification_block_hash")?,
                chain_length: req_str(v, "chain_length")?
                    .parse()
                    .map_err(|_| DuoError::InvariantViolation("bad chain_length".into()))?,
                sub_chain_balance: req_decimal(v, "sub_chain_balance")?,
                sub_chain_length: req_str(v, "sub_chain_length")?
                    .parse()
                    .map_err(|_| DuoError::InvariantViolation("bad sub_chain_length".into()))?,
                sub_chain_hash: req_str(v, "sub_chain_hash")?,
                full_verification: v
                    .get("full_verification")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            K::Reset => BlockPayload::Reset,
            K::Upgrade => BlockPayload::Upgrade,
        })
    }
}

// ── Block ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: BlockPayload,
}

impl Block {
    pub fn new(header: BlockHeader, payload: BlockPayload) -> Self {
        Self { header, payload }
    }

    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }

    pub fn block_hash(&self) -> &BlockHash {
        &self.header.block_hash
    }

    pub fn hashable(&self) -> Vec<String> {
        let mut out = self.header.prefix_hashable();
        self.payload.append_hashable(&mut out);
        out
    }

    pub fn canonical_hash(&self) -> BlockHash {
        sha256_concat(&self.hashable())
    }

    /// Raises `HashMismatch` if the stored hash disagrees with a fresh
    /// recomputation over `hashable()`.
    pub fn validate_hash(&self, index: usize) -> Result<(), DuoError> {
        let recomputed = self.canonical_hash();
        if recomputed != self.header.block_hash {
            return Err(DuoError::HashMismatch {
                block_hash: self.header.block_hash.0.clone(),
                index,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        self.header.to_json(&mut map);
        self.payload.to_json_fields(&mut map);
        Value::Object(map)
    }

    pub fn from_json(v: &Value) -> Result<Self, DuoError> {
        let header = BlockHeader::from_json(v)?;
        let kind = BlockKind::from_u32(header.block_type).ok_or_else(|| {
            DuoError::InvariantViolation(format!("unknown block_type {}", header.block_type))
        })?;
        let payload = BlockPayload::from_json(kind, v)?;
        if payload.kind().as_u32() != header.block_type {
            return Err(DuoError::TypeMismatch {
                expected: payload.kind().as_u32(),
                got: header.block_type,
                block_hash: header.block_hash.0.clone(),
            });
        }
        Ok(Block { header, payload })
    }
}
