//! Integration tests for merchant profiles, listing creation and browsing.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use leftover_integration_tests::TestApp;

// =============================================================================
// Profiles
// =============================================================================

#[tokio::test]
async fn test_setup_then_show_includes_aggregates() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    app.listing(&merchant, "Bread", 60).await;
    app.listing(&merchant, "Croissant", 60).await;

    let res = app.get(&format!("/merchant/{merchant}")).await;

    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.body["merchant"]["shop_name"], "Corner Bakery");
    assert_eq!(res.body["merchant"]["category"], "bakery");
    assert_eq!(res.body["product_count"], 2);
    assert_eq!(res.body["total_reviews"], 0);
    assert_eq!(res.body["average_rating"], 0.0);
}

#[tokio::test]
async fn test_setup_replaces_existing_profile() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;

    let res = app
        .post(
            "/merchant/setup",
            json!({ "user_id": merchant, "shop_name": "Corner Bakery & Cafe", "address": "Taipei" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get(&format!("/merchant/{merchant}")).await;
    assert_eq!(res.body["merchant"]["shop_name"], "Corner Bakery & Cafe");
    assert_eq!(res.body["merchant"]["category"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_setup_for_unknown_user_is_not_found() {
    let app = TestApp::new();

    let res = app
        .post(
            "/merchant/setup",
            json!({ "user_id": "usr_ghost", "shop_name": "Ghost Kitchen", "address": "Nowhere" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_setup_requires_shop_name() {
    let app = TestApp::new();
    let (_, user) = app.login("google", "owner").await;

    let res = app
        .post("/merchant/setup", json!({ "user_id": user, "address": "Taipei" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "shop_name is required");
}

#[tokio::test]
async fn test_show_unknown_merchant_is_not_found() {
    let app = TestApp::new();
    let (_, consumer) = app.login("google", "consumer").await;

    let res = app.get(&format!("/merchant/{consumer}")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_by_name_and_category() {
    let app = TestApp::new();
    app.merchant("shop-1", "Corner Bakery").await;
    let (_, sushi) = app.login("google", "shop-2").await;
    app.post(
        "/merchant/setup",
        json!({ "user_id": sushi, "shop_name": "Sushi Go", "address": "Da'an, Taipei", "category": "japanese" }),
    )
    .await;

    let res = app.get("/merchants/search?q=bakery").await;
    let names: Vec<&str> = res.body.as_array().unwrap().iter().filter_map(|m| m["shop_name"].as_str()).collect();
    assert_eq!(names, vec!["Corner Bakery"]);

    let res = app.get("/merchants/search?category=japanese").await;
    let names: Vec<&str> = res.body.as_array().unwrap().iter().filter_map(|m| m["shop_name"].as_str()).collect();
    assert_eq!(names, vec!["Sushi Go"]);

    let res = app.get("/merchants/search?q=taipei").await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let app = TestApp::new();
    app.merchant("shop-1", "Corner Bakery").await;

    let res = app.get("/merchants/search?q=%25").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!([]));
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_non_merchant_cannot_list() {
    let app = TestApp::new();
    let (_, consumer) = app.login("google", "consumer").await;

    let res = app
        .post(
            "/products",
            json!({
                "merchant_id": consumer,
                "name": "Bread",
                "original_price": 50,
                "current_price": 25,
                "expiry_minutes": 60,
                "latitude": 25.0,
                "longitude": 121.5,
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "User is not a merchant");
}

#[tokio::test]
async fn test_listing_validation_errors() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    let base = json!({
        "merchant_id": merchant,
        "name": "Bread",
        "original_price": 50,
        "current_price": 25,
        "expiry_minutes": 60,
        "latitude": 25.0,
        "longitude": 121.5,
    });

    let mut missing_price = base.clone();
    missing_price.as_object_mut().unwrap().remove("current_price");
    let res = app.post("/products", missing_price).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "current_price is required");

    let mut negative_expiry = base.clone();
    negative_expiry["expiry_minutes"] = json!(-5);
    assert_eq!(app.post("/products", negative_expiry).await.status, StatusCode::BAD_REQUEST);

    let mut bad_latitude = base.clone();
    bad_latitude["latitude"] = json!(91.0);
    assert_eq!(app.post("/products", bad_latitude).await.status, StatusCode::BAD_REQUEST);

    let mut markup = base;
    markup["current_price"] = json!(80);
    assert_eq!(app.post("/products", markup).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_browse_reports_discount_and_orders_by_expiry() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    let later = app.listing(&merchant, "Milk", 600).await;
    let sooner = app.listing(&merchant, "Sushi Box", 30).await;

    let res = app.get("/products").await;
    let listings = res.body.as_array().unwrap();

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0]["id"], sooner);
    assert_eq!(listings[1]["id"], later);
    assert_eq!(listings[0]["discount_percent"], 50);
    assert_eq!(listings[0]["status"], "AVAILABLE");
    assert!(listings[0]["expiry_date"].as_str().is_some());
    assert!(listings[0].get("expires_at").is_none());
}

#[tokio::test]
async fn test_browse_paging() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    for (i, minutes) in [10, 20, 30].into_iter().enumerate() {
        app.listing(&merchant, &format!("Item {i}"), minutes).await;
    }

    let res = app.get("/products?limit=2&offset=1").await;
    let names: Vec<&str> = res.body.as_array().unwrap().iter().filter_map(|l| l["name"].as_str()).collect();
    assert_eq!(names, vec!["Item 1", "Item 2"]);
}

#[tokio::test]
async fn test_browse_nearby_filters_and_sorts_by_distance() {
    let app = TestApp::new();
    let merchant = app.merchant("shop-1", "Corner Bakery").await;
    let near = app.listing(&merchant, "Near", 60).await;

    // Kaohsiung, roughly 300 km from Taipei.
    app.post(
        "/products",
        json!({
            "merchant_id": merchant,
            "name": "Far",
            "original_price": 100,
            "current_price": 50,
            "expiry_minutes": 60,
            "latitude": 22.6273,
            "longitude": 120.3014,
        }),
    )
    .await;

    let res = app.get("/products?lat=25.0330&lng=121.5654&radius_km=5").await;
    let listings = res.body.as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], near);
    assert!(listings[0]["distance_km"].as_f64().unwrap() < 1.0);
}

#[tokio::test]
async fn test_browse_rejects_half_a_location() {
    let app = TestApp::new();

    let res = app.get("/products?lat=25.0").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
