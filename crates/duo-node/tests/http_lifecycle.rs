//! Exercises the HTTP surface end to end against a temp chain directory,
//! driving the router directly via `tower::ServiceExt::oneshot` rather than
//! binding a real socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use duo_chain::ChainStore;
use duo_rpc::{build_router, RpcState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> axum::Router {
    let dir = tempfile_dir();
    let store = Arc::new(ChainStore::new(dir, 30));
    build_router(RpcState::new(store))
}

fn tempfile_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("duo-node-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn init_chain_then_get_returns_the_same_chain() {
    let app = router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chain")
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    let id = created["ID"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/chain/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["ID"], id);
    assert_eq!(fetched["BlockHeight"], 0);
}

#[tokio::test]
async fn get_chain_for_unknown_uuid_is_404() {
    let app = router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/chain/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debit_then_accept_credit_moves_the_balance() {
    let app = router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/chain/actor-a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chain/actor-a/block/accept_credit")
                .header("content-type", "application/json")
                .body(Body::from(json!({"amount": "5.00", "ref_block_hash": ""}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/chain/actor-a/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let balance = json_body(response).await;
    assert_eq!(balance["balance"], "5.00");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/chain/actor-a/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = json_body(response).await;
    assert_eq!(status["Success"], true);
}

#[tokio::test]
async fn rejects_a_non_positive_debit_amount() {
    let app = router();
    app.clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/chain/actor-b")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chain/actor-b/block/debit")
                .header("content-type", "application/json")
                .body(Body::from(json!({"amount": "0.00"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
