mod common;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use paperbot::api::router::create_router;
use paperbot::faucet::FaucetConfig;

fn app() -> axum::Router {
    create_router(common::test_state(FaucetConfig::default()))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn buy_body(owner: &str, token: &str, shares: &str, price: &str) -> Value {
    json!({
        "owner": owner,
        "token_id": token,
        "outcome": "yes",
        "shares": shares.parse::<Decimal>().unwrap(),
        "price": price.parse::<Decimal>().unwrap(),
        "market_title": "Test market",
    })
}

#[tokio::test]
async fn health_reports_healthy() {
    let resp = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn buy_then_list_shows_open_position() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(post("/api/paper/buy", buy_body("0xAbC", "tok-1", "20", "0.40")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["position_id"].is_string());

    // Owner lookup is case-insensitive
    let resp = app
        .oneshot(get("/api/paper/positions/0xABC"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let open = body["data"]["open"].as_array().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["token_id"], "tok-1");
    assert_eq!(open[0]["status"], "open");
}

#[tokio::test]
async fn oversell_returns_bad_request() {
    let app = app();

    app.clone()
        .oneshot(post("/api/paper/buy", buy_body("0xabc", "tok-1", "5", "0.50")))
        .await
        .unwrap();

    let resp = app
        .oneshot(post(
            "/api/paper/sell",
            json!({
                "owner": "0xabc",
                "token_id": "tok-1",
                "shares": "6",
                "price": "0.60",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn sell_without_position_returns_not_found() {
    let resp = app()
        .oneshot(post(
            "/api/paper/sell",
            json!({
                "owner": "0xabc",
                "token_id": "tok-none",
                "shares": "1",
                "price": "0.60",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_reflects_buys() {
    let app = app();

    app.clone()
        .oneshot(post("/api/paper/buy", buy_body("0xabc", "tok-1", "20", "0.40")))
        .await
        .unwrap();

    let resp = app
        .oneshot(get("/api/paper/summary/0xabc"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["total_locked"], "8.00");
}

#[tokio::test]
async fn faucet_grants_then_rejects_over_quota() {
    let config = FaucetConfig {
        max_amount: Decimal::from(60),
        ..FaucetConfig::default()
    };
    let app = create_router(common::test_state(config));

    let resp = app
        .clone()
        .oneshot(post("/api/faucet/claim", json!({ "address": "0xabc", "amount": "60" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["tx_hash"].is_string());

    let resp = app
        .oneshot(post("/api/faucet/claim", json!({ "address": "0xabc", "amount": "60" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["retry_after_hours"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn faucet_claim_without_amount_takes_single_claim_max() {
    let resp = app()
        .oneshot(post("/api/faucet/claim", json!({ "address": "0xabc" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["data"]["amount"], "10");
}

#[tokio::test]
async fn quote_proxy_returns_midpoint() {
    let resp = app().oneshot(get("/api/quote/tok-1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["data"]["mid"], "0.55");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let resp = app().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_payload_carries_open_positions_gauge() {
    let app = app();

    app.clone()
        .oneshot(post("/api/paper/buy", buy_body("0xabc", "tok-1", "10", "0.50")))
        .await
        .unwrap();

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let payload = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(payload.contains("open_positions"));
}
