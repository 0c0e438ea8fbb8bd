//! Integration tests for phone registration with one-time codes.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use leftover_integration_tests::TestApp;

const PHONE: &str = "0912345678";

async fn send_code(app: &TestApp, phone: &str) -> String {
    let res = app.post("/register/send-sms", json!({ "phone": phone })).await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.body["demo"], true);
    app.delivery.last_code(phone).unwrap()
}

#[tokio::test]
async fn test_send_sms_delivers_six_digit_code() {
    let app = TestApp::new();

    let code = send_code(&app, PHONE).await;

    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(app.delivery.sent_count(), 1);
}

#[tokio::test]
async fn test_verify_with_correct_code_logs_in() {
    let app = TestApp::new();
    let code = send_code(&app, PHONE).await;

    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": code }))
        .await;

    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert!(!res.body["token"].as_str().unwrap().is_empty());
    assert!(res.body["user_id"].as_str().unwrap().starts_with("usr_"));
    assert_eq!(res.body["is_merchant"], false);
    assert_eq!(res.body["phone"], PHONE);
}

#[tokio::test]
async fn test_verify_with_wrong_code_is_unauthorized_and_keeps_code() {
    let app = TestApp::new();
    let code = send_code(&app, PHONE).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": wrong }))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "Invalid verification code");

    // A failed attempt does not burn the pending code.
    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": code }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = TestApp::new();
    let code = send_code(&app, PHONE).await;
    let body = json!({ "phone": PHONE, "code": code });

    assert_eq!(app.post("/register/verify-sms", body.clone()).await.status, StatusCode::OK);

    let res = app.post("/register/verify-sms", body).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "No verification code found. Please request a new one.");
}

#[tokio::test]
async fn test_expired_code_is_rejected_then_forgotten() {
    let app = TestApp::with_code_ttl(Duration::from_millis(200));
    let code = send_code(&app, PHONE).await;
    let body = json!({ "phone": PHONE, "code": code });

    tokio::time::sleep(Duration::from_millis(400)).await;

    let res = app.post("/register/verify-sms", body.clone()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "Verification code expired. Please request a new one.");

    let res = app.post("/register/verify-sms", body).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "No verification code found. Please request a new one.");
}

#[tokio::test]
async fn test_resend_replaces_pending_code() {
    let app = TestApp::new();
    let first = send_code(&app, PHONE).await;
    let second = send_code(&app, PHONE).await;

    if first != second {
        let res = app
            .post("/register/verify-sms", json!({ "phone": PHONE, "code": first }))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": second }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_without_request_is_unauthorized() {
    let app = TestApp::new();

    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": "123456" }))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_code_is_bad_request() {
    let app = TestApp::new();
    send_code(&app, PHONE).await;

    let res = app
        .post("/register/verify-sms", json!({ "phone": PHONE, "code": "12ab" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_phone_is_bad_request() {
    let app = TestApp::new();

    let res = app.post("/register/send-sms", json!({ "phone": "12345" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.delivery.sent_count(), 0);
}

#[tokio::test]
async fn test_same_phone_resolves_to_same_user() {
    let app = TestApp::new();

    let mut user_ids = Vec::new();
    for _ in 0..2 {
        let code = send_code(&app, PHONE).await;
        let res = app
            .post("/register/verify-sms", json!({ "phone": PHONE, "code": code }))
            .await;
        user_ids.push(res.body["user_id"].as_str().unwrap().to_owned());
    }

    assert_eq!(user_ids.first(), user_ids.last());
}
