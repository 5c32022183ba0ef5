//! One append endpoint per block variant (§6.3). Each handler loads the
//! named chain, builds a single `BlockHeader::pending` + `BlockPayload` from
//! the request, appends it (the chain recomputes linkage, height, and
//! balance), persists, and returns the newly appended block's JSON. This
//! mirrors the original's per-call single-chain granularity: a multi-chain
//! exchange like signalling is the caller's responsibility to drive across
//! two separate calls, one chain at a time.

use axum::extract::{Path, State};
use axum::Json;
use duo_core::block::BlockHeader;
use duo_core::{Amount, Block, BlockKind, ChainId};
use serde_json::Value;

use crate::dto::*;
use crate::error::{AppError, AppResult};
use crate::state::RpcState;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

async fn append_and_respond(
    state: &RpcState,
    chain_uuid: String,
    kind: BlockKind,
    balance_delta: Amount,
    payload: duo_core::block::BlockPayload,
) -> AppResult<Json<Value>> {
    let uuid = ChainId(chain_uuid);
    let mut chain = state.store.get_chain(&uuid)?;
    let hash = chain.append(Block::new(
        BlockHeader::pending(kind, now_ms(), balance_delta),
        payload,
    ))?;
    state.store.save_chain(&chain)?;
    state.events.state_change(&uuid, kind.name(), Some(hash.as_str()));
    let block = chain
        .get_by_hash(hash.as_str())
        .expect("just appended")
        .to_json();
    Ok(Json(block))
}

pub async fn send_signal(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<SendSignalRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::SignalSent, Amount::ZERO, req.into_payload()).await
}

pub async fn receive_signal(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ReceiveSignalRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::SignalReceived, Amount::ZERO, req.into_payload()).await
}

pub async fn deliver_signal(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<DeliverSignalRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::SignalDelivered, Amount::ZERO, req.into_payload()).await
}

pub async fn send_signal_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<SendSignalRewardRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::SignalRewardSent, Amount::ZERO, req.into_payload()).await
}

pub async fn receive_signal_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ReceiveSignalRewardRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::SignalRewardReceived, Amount::ZERO, req.into_payload()).await
}

pub async fn target(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<TargetRequest>,
) -> AppResult<Json<Value>> {
    let payload = req.into_payload().map_err(AppError::BadRequest)?;
    append_and_respond(&state, chain_uuid, BlockKind::TargetCreated, Amount::ZERO, payload).await
}

pub async fn accept_target(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AcceptTargetRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::TargetAccepted, Amount::ZERO, req.into_payload()).await
}

pub async fn action(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ActionRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::Action, Amount::ZERO, req.into_payload()).await
}

pub async fn work_output(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<WorkOutputRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::WorkOutput, Amount::ZERO, req.into_payload()).await
}

pub async fn send_target_reward_claim(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<SendTargetRewardClaimRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::TargetRewardClaimSent, Amount::ZERO, req.into_payload()).await
}

pub async fn receive_target_reward_claim(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ReceiveTargetRewardClaimRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::TargetRewardClaimReceived, Amount::ZERO, req.into_payload()).await
}

pub async fn send_target_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<SendTargetRewardRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::TargetRewardSent, Amount::ZERO, req.into_payload()).await
}

pub async fn receive_target_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ReceiveTargetRewardRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::TargetRewardReceived, Amount::ZERO, req.into_payload()).await
}

pub async fn debit(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<DebitRequest>,
) -> AppResult<Json<Value>> {
    let (payload, delta) = req.into_payload().map_err(AppError::BadRequest)?;
    append_and_respond(&state, chain_uuid, BlockKind::Debit, delta, payload).await
}

pub async fn accept_credit(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AcceptCreditRequest>,
) -> AppResult<Json<Value>> {
    let (payload, delta) = req.into_payload().map_err(AppError::BadRequest)?;
    append_and_respond(&state, chain_uuid, BlockKind::CreditAccepted, delta, payload).await
}

pub async fn reject_credit(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<CreditRejectedRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::CreditRejected, Amount::ZERO, req.into_payload()).await
}

pub async fn send_work_output_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<SendWorkOutputRewardRequest>,
) -> AppResult<Json<Value>> {
    let payload = req.into_payload().map_err(AppError::BadRequest)?;
    append_and_respond(&state, chain_uuid, BlockKind::WorkOutputRewardSent, Amount::ZERO, payload).await
}

pub async fn receive_work_output_reward(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<ReceiveWorkOutputRewardRequest>,
) -> AppResult<Json<Value>> {
    let payload = req.into_payload().map_err(AppError::BadRequest)?;
    append_and_respond(&state, chain_uuid, BlockKind::WorkOutputRewardReceived, Amount::ZERO, payload).await
}

pub async fn access_contract_own(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AccessContractOwnRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::AccessContractOwn, Amount::ZERO, req.into_payload()).await
}

pub async fn access_contract_other(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AccessContractOtherRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::AccessContractOther, Amount::ZERO, req.into_payload()).await
}

pub async fn access_contract_other_event_open(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AccessContractOtherEventOpenRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::AccessContractOtherEventOpen, Amount::ZERO, req.into_payload()).await
}

pub async fn access_contract_own_event_ask(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AccessContractOwnEventAskRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::AccessContractOwnEventAsk, Amount::ZERO, req.into_payload()).await
}

pub async fn access_contract_other_event_close(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<AccessContractOtherEventCloseRequest>,
) -> AppResult<Json<Value>> {
    append_and_respond(&state, chain_uuid, BlockKind::AccessContractOtherEventClose, Amount::ZERO, req.into_payload()).await
}

pub async fn reset(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    req: Option<Json<ResetRequest>>,
) -> AppResult<Json<Value>> {
    let payload = req.map(|Json(r)| r).unwrap_or_default().into_payload();
    append_and_respond(&state, chain_uuid, BlockKind::Reset, Amount::ZERO, payload).await
}

pub async fn upgrade(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    req: Option<Json<UpgradeRequest>>,
) -> AppResult<Json<Value>> {
    let payload = req.map(|Json(r)| r).unwrap_or_default().into_payload();
    append_and_respond(&state, chain_uuid, BlockKind::Upgrade, Amount::ZERO, payload).await
}
