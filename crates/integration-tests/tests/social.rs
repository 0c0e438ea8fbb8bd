//! Integration tests for reviews, favorites and notifications.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use leftover_integration_tests::TestApp;

/// A merchant, a consumer and one completed order between them.
async fn completed_order(app: &TestApp) -> (String, String, i64) {
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    let (_, consumer) = app.login("google", "consumer-1").await;
    let listing = app.listing(&merchant, "Sushi Box", 60).await;
    let res = app.purchase(listing, &consumer).await;
    (merchant, consumer, res.body["order_id"].as_i64().unwrap())
}

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn test_reviews_update_merchant_average() {
    let app = TestApp::new();
    let (merchant, consumer, order) = completed_order(&app).await;

    for rating in [5, 4] {
        let res = app
            .post(
                "/reviews",
                json!({
                    "order_id": order,
                    "user_id": consumer,
                    "merchant_id": merchant,
                    "rating": rating,
                    "comment": "Fresh and cheap",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        assert!(res.body["id"].as_i64().is_some());
    }

    let res = app.get(&format!("/reviews/merchant/{merchant}")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total_reviews"], 2);
    assert_eq!(res.body["average_rating"], 4.5);
    assert_eq!(res.body["reviews"].as_array().unwrap().len(), 2);

    let res = app.get(&format!("/merchant/{merchant}")).await;
    assert_eq!(res.body["average_rating"], 4.5);
}

#[tokio::test]
async fn test_review_rating_out_of_range_is_bad_request() {
    let app = TestApp::new();
    let (merchant, consumer, order) = completed_order(&app).await;

    for rating in [0, 6] {
        let res = app
            .post(
                "/reviews",
                json!({ "order_id": order, "user_id": consumer, "merchant_id": merchant, "rating": rating }),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.error(), format!("rating must be between 1 and 5 (got {rating})"));
    }
}

#[tokio::test]
async fn test_review_for_unknown_order_is_not_found() {
    let app = TestApp::new();
    let (merchant, consumer, _) = completed_order(&app).await;

    let res = app
        .post(
            "/reviews",
            json!({ "order_id": 424_242, "user_id": consumer, "merchant_id": merchant, "rating": 5 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_merchant_without_reviews_has_zero_average() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;

    let res = app.get(&format!("/reviews/merchant/{merchant}")).await;
    assert_eq!(res.body["total_reviews"], 0);
    assert_eq!(res.body["average_rating"], 0.0);
    assert_eq!(res.body["reviews"], json!([]));
}

// =============================================================================
// Favorites
// =============================================================================

#[tokio::test]
async fn test_toggle_favorite_twice_round_trips() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    let (_, consumer) = app.login("google", "consumer-1").await;
    let body = json!({ "user_id": consumer, "merchant_id": merchant });
    let check = format!("/favorites/check?user_id={consumer}&merchant_id={merchant}");

    let res = app.post("/favorites/toggle", body.clone()).await;
    assert_eq!(res.body["is_favorite"], true);
    assert_eq!(res.body["message"], "Added to favorites");
    assert_eq!(app.get(&check).await.body["is_favorite"], true);

    let res = app.get(&format!("/favorites/{consumer}")).await;
    let favorites = res.body.as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["shop_name"], "Corner Bakery");

    let res = app.post("/favorites/toggle", body).await;
    assert_eq!(res.body["is_favorite"], false);
    assert_eq!(res.body["message"], "Removed from favorites");
    assert_eq!(app.get(&check).await.body["is_favorite"], false);
    assert_eq!(app.get(&format!("/favorites/{consumer}")).await.body, json!([]));
}

#[tokio::test]
async fn test_favorite_unknown_merchant_is_not_found() {
    let app = TestApp::new();
    let (_, consumer) = app.login("google", "consumer-1").await;

    let res = app
        .post(
            "/favorites/toggle",
            json!({ "user_id": consumer, "merchant_id": "usr_ghost" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_check_requires_both_ids() {
    let app = TestApp::new();
    let (_, consumer) = app.login("google", "consumer-1").await;

    let res = app.get(&format!("/favorites/check?user_id={consumer}")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notification_lifecycle() {
    let app = TestApp::new();
    let (_, user) = app.login("google", "consumer-1").await;

    let res = app
        .post(
            "/notifications",
            json!({ "user_id": user, "title": "Flash sale", "body": "Everything 70% off", "type": "promo" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    let id = res.body["id"].as_i64().unwrap();

    let inbox = app.get(&format!("/notifications/{user}")).await;
    assert_eq!(inbox.body["unread_count"], 1);
    assert_eq!(inbox.body["notifications"][0]["title"], "Flash sale");
    assert_eq!(inbox.body["notifications"][0]["type"], "promo");
    assert_eq!(inbox.body["notifications"][0]["is_read"], false);

    let res = app.put(&format!("/notifications/{id}/read")).await;
    assert_eq!(res.status, StatusCode::OK);

    let inbox = app.get(&format!("/notifications/{user}")).await;
    assert_eq!(inbox.body["unread_count"], 0);
    assert_eq!(inbox.body["notifications"][0]["is_read"], true);
}

#[tokio::test]
async fn test_notification_kind_defaults() {
    let app = TestApp::new();
    let (_, user) = app.login("google", "consumer-1").await;

    app.post("/notifications", json!({ "user_id": user, "title": "Hello" }))
        .await;

    let inbox = app.get(&format!("/notifications/{user}")).await;
    assert_eq!(inbox.body["notifications"][0]["type"], "general");
}

#[tokio::test]
async fn test_notification_validation() {
    let app = TestApp::new();
    let (_, user) = app.login("google", "consumer-1").await;

    let res = app.post("/notifications", json!({ "user_id": user })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "title is required");

    let res = app
        .post("/notifications", json!({ "user_id": "usr_ghost", "title": "Hi" }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_unknown_notification_read_is_not_found() {
    let app = TestApp::new();

    let res = app.put("/notifications/999/read").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error(), "Notification not found");
}
