mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use futures_util::future::join_all;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use bitpanel_backend::{AppState, build_router};

use crate::common::{BTC_USD, ScriptedSource, TIP_HEIGHT, setup_coordinator, test_config};

// Router over a coordinator whose initial load already ran against healthy
// scripted sources (30 days of history)
async fn build_test_router() -> Router {
    let coordinator = setup_coordinator(Arc::new(ScriptedSource::healthy()), test_config()).await;
    coordinator.initial_load().await;

    build_router(AppState {
        coordinator,
        history_window_days: 365,
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_dashboard_data_shape() {
    let app = build_test_router().await;

    let (status, json) = get_json(app, "/api/data").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["lastUpdateTimestamp"].is_i64());
    let until_next = json["timeUntilNextUpdate"].as_i64().unwrap();
    assert!(until_next > 0 && until_next <= 600_000);

    assert_eq!(json["prices"]["btc_usd"], BTC_USD);
    assert_eq!(json["prices"]["usdt_brl"], 5.0);
    assert_eq!(json["mempool"]["block_height"], TIP_HEIGHT);
    assert_eq!(json["mempool"]["calculated_supply"], 19_687_550.0);
    assert_eq!(json["fearGreed"]["value"], 55);
    assert_eq!(json["fearGreed"]["classification"], "Greed");
    assert!(json["globalMetrics"]["market_cap_usd"].is_f64());
    // 30 closes are far from the 200 needed
    assert!(json["globalMetrics"]["mayer_multiple"].is_null());
}

#[tokio::test]
async fn test_concurrent_first_readers_all_get_data() {
    let coordinator = setup_coordinator(Arc::new(ScriptedSource::healthy()), test_config()).await;
    let app = build_router(AppState {
        coordinator: coordinator.clone(),
        history_window_days: 365,
    });

    let readers = (0..4).map(|_| get_json(app.clone(), "/api/data"));
    let loader = coordinator.initial_load();
    let (responses, ()) = tokio::join!(join_all(readers), loader);

    for (status, json) in responses {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mempool"]["block_height"], TIP_HEIGHT);
    }
}

#[tokio::test]
async fn test_historical_prices_window() {
    let app = build_test_router().await;

    let (status, json) = get_json(app.clone(), "/api/historical-prices?days=7").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 7);
    assert!(entries[0]["date"].as_str().unwrap() < entries[6]["date"].as_str().unwrap());
    assert!(entries[0]["price_brl"].is_f64());

    let (_, json) = get_json(app, "/api/historical-prices").await;
    assert_eq!(json.as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn test_huge_history_window_returns_everything() {
    let app = build_test_router().await;

    let (status, json) = get_json(app.clone(), "/api/historical-prices?days=4000000000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 30);

    let (status, json) = post_json(
        app,
        "/api/dca/simulate",
        json!({ "amount": 10, "currency": "usd", "frequency": "daily", "days": 4000000000u32 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["purchaseCount"], 30);
}

#[tokio::test]
async fn test_dca_simulate() {
    let app = build_test_router().await;

    let (status, json) = post_json(
        app,
        "/api/dca/simulate",
        json!({ "amount": 10, "currency": "usd", "frequency": "daily" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["purchaseCount"], 30);
    assert_eq!(json["totalInvested"], 300.0);
    assert_eq!(json["currency"], "usd");
    assert_eq!(json["insufficientData"], false);
}

#[tokio::test]
async fn test_dca_simulate_rejects_invalid_parameters() {
    let app = build_test_router().await;

    let (status, json) = post_json(
        app.clone(),
        "/api/dca/simulate",
        json!({ "amount": 0, "currency": "usd", "frequency": "daily" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("amount"));

    let (status, _) = post_json(
        app.clone(),
        "/api/dca/simulate",
        json!({ "amount": 10, "currency": "brl", "frequency": "weekly" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app,
        "/api/dca/simulate",
        json!({ "amount": 10, "currency": "brl", "frequency": "monthly", "dayOfMonth": 32 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dca_oversized_amount_is_rejected() {
    let app = build_test_router().await;

    let (status, json) = post_json(
        app.clone(),
        "/api/dca/simulate",
        json!({ "amount": 1e28, "currency": "usd", "frequency": "daily" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("at most"));

    let (status, _) = post_json(
        app,
        "/api/dca/best-day",
        json!({ "amount": 1e28, "currency": "brl" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dca_best_day() {
    let app = build_test_router().await;

    let (status, json) = post_json(
        app,
        "/api/dca/best-day",
        json!({ "amount": 50, "currency": "brl" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let weekly = json["weekly"].as_array().unwrap();
    let monthly = json["monthly"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(monthly.len(), 31);
    assert_eq!(json["bestWeekly"]["day"], weekly[0]["day"]);

    let percents: Vec<f64> = weekly
        .iter()
        .map(|entry| entry["gainLossPercent"].as_f64().unwrap())
        .collect();
    assert!(percents.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn test_health_reports_readiness() {
    let coordinator = setup_coordinator(Arc::new(ScriptedSource::healthy()), test_config()).await;
    let app = build_router(AppState {
        coordinator: coordinator.clone(),
        history_window_days: 365,
    });

    let (status, json) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], false);

    coordinator.initial_load().await;

    let (_, json) = get_json(app, "/health").await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ready"], true);
}
