//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness probe
//! GET  /ready                       - Readiness probe (pings storage)
//!
//! # Auth
//! POST /login                       - External credential login
//! POST /register/send-sms           - Issue a one-time code
//! POST /register/verify-sms         - Verify a code, log in by phone
//! GET  /me                          - Caller identity (Bearer token)
//!
//! # Listings
//! POST /products                    - Publish a listing
//! GET  /products                    - Available listings (paged, optional nearby filter)
//! POST /purchase/{id}               - Buy a listing
//!
//! # Merchants
//! POST /merchant/setup              - Create or replace a shop profile
//! GET  /merchant/{merchant_id}      - Profile with aggregates
//! GET  /merchants/search            - Search by name, address, category
//!
//! # Social
//! POST /reviews                     - Review an order
//! GET  /reviews/merchant/{id}       - Merchant reviews with average
//! POST /favorites/toggle            - Flip a favorite
//! GET  /favorites/check             - Is a merchant a favorite
//! GET  /favorites/{user_id}         - A user's favorites
//! POST /notifications               - Create a notification
//! GET  /notifications/{id}          - A user's inbox (id is the user id)
//! PUT  /notifications/{id}/read     - Mark one read
//! ```

pub mod auth;
pub mod favorites;
pub mod health;
pub mod merchants;
pub mod notifications;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    routing::{get, post, put},
};

use leftover_core::UserId;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::Storage;

/// Parse a user id taken from the path.
pub(crate) fn path_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::parse(raw).ok_or_else(|| AppError::BadRequest("invalid user id".to_string()))
}

/// Create the auth routes router.
pub fn auth_routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/login", post(auth::login::<S>))
        .route("/register/send-sms", post(auth::send_sms::<S>))
        .route("/register/verify-sms", post(auth::verify_sms::<S>))
        .route("/me", get(auth::me::<S>))
}

/// Create the listing and purchase routes router.
pub fn product_routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/products", get(products::index::<S>).post(products::create::<S>))
        .route("/purchase/{id}", post(products::purchase::<S>))
}

/// Create the merchant routes router.
pub fn merchant_routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/merchant/setup", post(merchants::setup::<S>))
        .route("/merchant/{merchant_id}", get(merchants::show::<S>))
        .route("/merchants/search", get(merchants::search::<S>))
}

/// Create the reviews, favorites and notifications router.
pub fn social_routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/reviews", post(reviews::create::<S>))
        .route("/reviews/merchant/{merchant_id}", get(reviews::for_merchant::<S>))
        .route("/favorites/toggle", post(favorites::toggle::<S>))
        .route("/favorites/check", get(favorites::check::<S>))
        .route("/favorites/{user_id}", get(favorites::for_user::<S>))
        .route("/notifications", post(notifications::create::<S>))
        .route("/notifications/{id}", get(notifications::inbox::<S>))
        .route("/notifications/{id}/read", put(notifications::mark_read::<S>))
}

/// Create all routes for the service.
pub fn routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness::<S>))
        .merge(auth_routes())
        .merge(product_routes())
        .merge(merchant_routes())
        .merge(social_routes())
}
