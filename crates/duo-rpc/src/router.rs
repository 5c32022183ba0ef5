//! Builds the axum router: one route per resource, grouped the way the
//! original's path table reads (lifecycle, query, recovery, credibility,
//! cross-chain verification, per-variant block append, service state).

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers_block as block;
use crate::handlers_chain as chain;
use crate::state::RpcState;

pub fn build_router(state: RpcState) -> Router {
    Router::new()
        // ── Lifecycle / query ────────────────────────────────────────────────
        .route("/chains", get(chain::get_chains))
        .route("/chain", post(chain::init_chain))
        .route("/chain/:chain_uuid", get(chain::get_chain).put(chain::init_chain_with_id))
        .route("/chain/:chain_uuid/balance", get(chain::get_balance))
        .route("/chain/:chain_uuid/block/:block_hash", get(chain::get_block))
        .route("/chain/:chain_uuid/block/query", post(chain::query_blocks))
        .route(
            "/chain/:chain_uuid/query_received_signals",
            post(chain::query_received_signals),
        )
        .route("/chain/:chain_uuid/delete", post(chain::delete_chain))
        .route(
            "/chain/:chain_uuid/block/:block_hash/update",
            post(chain::update_block),
        )
        .route(
            "/chain/:chain_uuid/block/:block_hash/delete",
            post(chain::delete_block),
        )
        // ── Recovery (§7) ────────────────────────────────────────────────────
        .route("/chain/:chain_uuid/verify", get(chain::verify_chain))
        .route("/chain/:chain_uuid/make_valid", post(chain::make_valid))
        // ── Credibility ──────────────────────────────────────────────────────
        .route("/chain/:chain_uuid/credibility", get(chain::credibility))
        .route(
            "/chain/:chain_uuid/credibility/:other_chain_uuid",
            get(chain::credibility_for_peer),
        )
        // ── Cross-chain verification (§4.5) ──────────────────────────────────
        .route(
            "/chain/:chain_uuid/cross_verify/:other_chain_uuid",
            get(chain::cross_verify),
        )
        .route(
            "/chain/:chain_uuid/hard_verify/:other_chain_uuid",
            get(chain::hard_verify),
        )
        .route(
            "/chain/:chain_uuid/confirm_verify/:other_chain_uuid",
            get(chain::confirm_verify),
        )
        // ── Signalling (§4.4) ────────────────────────────────────────────────
        .route("/chain/:chain_uuid/block/send_signal", post(block::send_signal))
        .route("/chain/:chain_uuid/block/receive_signal", post(block::receive_signal))
        .route("/chain/:chain_uuid/block/deliver_signal", post(block::deliver_signal))
        .route(
            "/chain/:chain_uuid/block/send_signal_reward",
            post(block::send_signal_reward),
        )
        .route(
            "/chain/:chain_uuid/block/receive_signal_reward",
            post(block::receive_signal_reward),
        )
        // ── Activity ─────────────────────────────────────────────────────────
        .route("/chain/:chain_uuid/block/action", post(block::action))
        .route("/chain/:chain_uuid/block/work_output", post(block::work_output))
        // ── Ledger ───────────────────────────────────────────────────────────
        .route("/chain/:chain_uuid/block/debit", post(block::debit))
        .route("/chain/:chain_uuid/block/accept_credit", post(block::accept_credit))
        .route("/chain/:chain_uuid/block/reject_credit", post(block::reject_credit))
        .route(
            "/chain/:chain_uuid/block/send_work_output_reward",
            post(block::send_work_output_reward),
        )
        .route(
            "/chain/:chain_uuid/block/receive_work_output_reward",
            post(block::receive_work_output_reward),
        )
        // ── Targets / bounties ───────────────────────────────────────────────
        .route("/chain/:chain_uuid/block/target", post(block::target))
        .route("/chain/:chain_uuid/block/accept_target", post(block::accept_target))
        .route(
            "/chain/:chain_uuid/block/send_target_reward_claim",
            post(block::send_target_reward_claim),
        )
        .route(
            "/chain/:chain_uuid/block/receive_target_reward_claim",
            post(block::receive_target_reward_claim),
        )
        .route(
            "/chain/:chain_uuid/block/send_target_reward",
            post(block::send_target_reward),
        )
        .route(
            "/chain/:chain_uuid/block/receive_target_reward",
            post(block::receive_target_reward),
        )
        // ── Access contracts ─────────────────────────────────────────────────
        .route(
            "/chain/:chain_uuid/block/access_contract_own",
            post(block::access_contract_own),
        )
        .route(
            "/chain/:chain_uuid/block/access_contract_other",
            post(block::access_contract_other),
        )
        .route(
            "/chain/:chain_uuid/block/access_contract_other_event_open",
            post(block::access_contract_other_event_open),
        )
        .route(
            "/chain/:chain_uuid/block/access_contract_own_event_ask",
            post(block::access_contract_own_event_ask),
        )
        .route(
            "/chain/:chain_uuid/block/access_contract_other_event_close",
            post(block::access_contract_other_event_close),
        )
        // ── Meta (§3.3) ──────────────────────────────────────────────────────
        .route("/chain/:chain_uuid/block/reset", post(block::reset))
        .route("/chain/:chain_uuid/block/upgrade", post(block::upgrade))
        // ── Service ──────────────────────────────────────────────────────────
        .route("/state", get(chain::service_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any))
        .with_state(state)
}
