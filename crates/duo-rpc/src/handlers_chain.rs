//! Chain lifecycle, query, verify/repair, credibility, and cross/hard
//! verification endpoints (§6.3).

use axum::extract::{Path, State};
use axum::Json;
use duo_core::{Block, ChainId, DuoError};
use serde_json::Value;
use uuid::Uuid;

use crate::dto::*;
use crate::error::{AppError, AppResult};
use crate::state::RpcState;

fn default_seed(uuid: &ChainId) -> String {
    format!("seed-{}", uuid.as_str())
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

/// `POST /chain` — generates a fresh random id server-side.
pub async fn init_chain(
    State(state): State<RpcState>,
    body: Option<Json<InitChainRequest>>,
) -> AppResult<Json<ChainSummary>> {
    let uuid = ChainId(Uuid::new_v4().to_string());
    let seed = body
        .and_then(|Json(r)| r.seed)
        .unwrap_or_else(|| default_seed(&uuid));
    let chain = state.store.init_chain(uuid.clone(), seed)?;
    state.events.state_change(&uuid, "init_chain", None);
    Ok(Json(ChainSummary::of(&chain, false)))
}

/// `PUT /chain/{chain_uuid}` — the caller supplies the id.
pub async fn init_chain_with_id(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    body: Option<Json<InitChainRequest>>,
) -> AppResult<Json<ChainSummary>> {
    let uuid = ChainId(chain_uuid);
    let seed = body
        .and_then(|Json(r)| r.seed)
        .unwrap_or_else(|| default_seed(&uuid));
    let chain = state.store.init_chain(uuid.clone(), seed)?;
    state.events.state_change(&uuid, "init_chain", None);
    Ok(Json(ChainSummary::of(&chain, false)))
}

pub async fn get_chain(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<ChainSummary>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    Ok(Json(ChainSummary::of(&chain, true)))
}

pub async fn get_chains(State(state): State<RpcState>) -> AppResult<Json<Vec<ChainSummary>>> {
    let mut out = Vec::new();
    for uuid in state.store.get_chains()? {
        let chain = state.store.get_chain(&uuid)?;
        out.push(ChainSummary::of(&chain, false));
    }
    Ok(Json(out))
}

pub async fn get_balance(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<BalanceResponse>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    Ok(Json(BalanceResponse { balance: chain.balance().to_string() }))
}

pub async fn get_block(
    State(state): State<RpcState>,
    Path((chain_uuid, block_hash)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let block = chain
        .get_by_hash(&block_hash)
        .ok_or_else(|| DuoError::NotFound(format!("block {block_hash}")))?;
    Ok(Json(block.to_json()))
}

pub async fn delete_chain(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let uuid = ChainId(chain_uuid);
    state.store.delete_chain(&uuid)?;
    state.events.state_change(&uuid, "delete_chain", None);
    Ok(Json(StatusResponse::ok()))
}

// ── Query ────────────────────────────────────────────────────────────────────

pub async fn query_blocks(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
    Json(req): Json<BlockQueryRequest>,
) -> AppResult<Json<Vec<Value>>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let kinds = req
        .block_type
        .into_kinds()
        .map_err(AppError::BadRequest)?;
    let attr = req.attr_query.map(AttrQueryDto::into_attr_query);
    let found = chain.block_query(&kinds, attr.as_ref(), req.window_far, req.window_near, req.multiple);
    Ok(Json(found.into_iter().map(Block::to_json).collect()))
}

/// `POST /chain/{chain_uuid}/query_received_signals` — a `SignalReceived`-only
/// convenience over the general query, `multiple` fixed to `true`.
pub async fn query_received_signals(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<Vec<Value>>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let found = chain.block_query(&[duo_core::BlockKind::SignalReceived], None, None, None, true);
    Ok(Json(found.into_iter().map(Block::to_json).collect()))
}

// ── Recovery (§7) ────────────────────────────────────────────────────────────

pub async fn verify_chain(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    Ok(Json(match chain.verify() {
        Ok(()) => StatusResponse::ok(),
        Err(e) => StatusResponse::failed(e.to_string()),
    }))
}

pub async fn make_valid(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let mut chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let result = chain.make_valid();
    state.store.save_chain(&chain)?;
    Ok(Json(match result {
        Ok(()) => StatusResponse::ok(),
        Err(e) => StatusResponse::failed(e.to_string()),
    }))
}

/// `POST /chain/{chain_uuid}/block/{block_hash}/update` — recovery tool:
/// overwrites the named block's stored fields from a caller-supplied JSON
/// body, taking its `block_hash` as-is rather than recomputing it. Does not
/// touch neighboring linkage; a follow-up `make_valid` is expected to
/// re-link and re-hash it.
pub async fn update_block(
    State(state): State<RpcState>,
    Path((chain_uuid, block_hash)): Path<(String, String)>,
    Json(req): Json<BlockMutationRequest>,
) -> AppResult<Json<StatusResponse>> {
    let mut chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let idx = chain
        .index_of_hash(&block_hash)
        .ok_or_else(|| DuoError::NotFound(format!("block {block_hash}")))?;
    let replacement = Block::from_json(&req.block)?;
    chain.blocks[idx] = replacement;
    state.store.save_chain(&chain)?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn delete_block(
    State(state): State<RpcState>,
    Path((chain_uuid, block_hash)): Path<(String, String)>,
) -> AppResult<Json<StatusResponse>> {
    let mut chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let idx = chain
        .index_of_hash(&block_hash)
        .ok_or_else(|| DuoError::NotFound(format!("block {block_hash}")))?;
    chain.blocks.remove(idx);
    state.store.save_chain(&chain)?;
    Ok(Json(StatusResponse::ok()))
}

// ── Credibility ──────────────────────────────────────────────────────────────

pub async fn credibility(
    State(state): State<RpcState>,
    Path(chain_uuid): Path<String>,
) -> AppResult<Json<std::collections::BTreeMap<String, CredibilityEntry>>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let report = chain.get_credibility(None, false);
    Ok(Json(
        report
            .into_iter()
            .map(|(peer, c)| (peer.0, CredibilityEntry::of(&c, false)))
            .collect(),
    ))
}

pub async fn credibility_for_peer(
    State(state): State<RpcState>,
    Path((chain_uuid, other_chain_uuid)): Path<(String, String)>,
) -> AppResult<Json<CredibilityEntry>> {
    let chain = state.store.get_chain(&ChainId(chain_uuid))?;
    let peer = ChainId(other_chain_uuid);
    let report = chain.get_credibility(Some(&peer), false);
    let entry = report
        .get(&peer)
        .cloned()
        .unwrap_or_default();
    Ok(Json(CredibilityEntry::of(&entry, false)))
}

// ── Cross-chain verification (§4.5) ─────────────────────────────────────────

pub async fn cross_verify(
    State(state): State<RpcState>,
    Path((chain_uuid, other_chain_uuid)): Path<(String, String)>,
) -> AppResult<Json<StatusResponse>> {
    let a = state.store.get_chain(&ChainId(chain_uuid))?;
    let b = state.store.get_chain(&ChainId(other_chain_uuid))?;
    Ok(Json(match duo_protocol::cross_verify(&a, &b) {
        Ok(()) => StatusResponse::ok(),
        Err(e) => StatusResponse::failed(e.to_string()),
    }))
}

/// `GET /chain/{chain_uuid}/hard_verify/{other_chain_uuid}` — writes
/// attestation blocks for both directions of the pair, matching the two
/// sequential `hard_verify` calls the original issues per request.
pub async fn hard_verify(
    State(state): State<RpcState>,
    Path((chain_uuid, other_chain_uuid)): Path<(String, String)>,
) -> AppResult<Json<StatusResponse>> {
    let mut a = state.store.get_chain(&ChainId(chain_uuid))?;
    let mut b = state.store.get_chain(&ChainId(other_chain_uuid))?;
    let ts = now_ms();

    let result = duo_protocol::hard_verify(&mut a, &mut b, ts)
        .and_then(|_| duo_protocol::hard_verify(&mut b, &mut a, ts));

    match result {
        Ok(_) => {
            state.store.save_chain(&a)?;
            state.store.save_chain(&b)?;
            state.events.state_change(&a.uuid, "hard_verify", Some(b.uuid.as_str()));
            Ok(Json(StatusResponse::ok()))
        }
        Err(e) => Ok(Json(StatusResponse::failed(e.to_string()))),
    }
}

pub async fn confirm_verify(
    State(state): State<RpcState>,
    Path((chain_uuid, other_chain_uuid)): Path<(String, String)>,
) -> AppResult<Json<StatusResponse>> {
    let a = state.store.get_chain(&ChainId(chain_uuid))?;
    let peer = ChainId(other_chain_uuid);
    match duo_protocol::confirm_verify(&a, &peer) {
        Ok(true) => Ok(Json(StatusResponse::ok())),
        Ok(false) => Ok(Json(StatusResponse::failed("no matching verification found"))),
        Err(e) => Ok(Json(StatusResponse::failed(e.to_string()))),
    }
}

// ── State ────────────────────────────────────────────────────────────────────

pub async fn service_state(State(state): State<RpcState>) -> AppResult<Json<StateResponse>> {
    Ok(Json(StateResponse {
        service_name: "DUO",
        chains: state.store.get_chains()?.len(),
    }))
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
