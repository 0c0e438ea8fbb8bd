//! Integration tests for the probes and unmatched routes.

use axum::http::StatusCode;
use serde_json::json;

use leftover_integration_tests::TestApp;

#[tokio::test]
async fn test_health_is_always_healthy() {
    let app = TestApp::new();

    let res = app.get("/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_ready_pings_storage() {
    let app = TestApp::new();

    let res = app.get("/ready").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "status": "ready" }));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let res = app.get("/seed").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
