//! Integration tests for Leftover.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests only
//! cargo test -p leftover-integration-tests
//!
//! # Include the PostgreSQL tests
//! LEFTOVER_TEST_DATABASE_URL=postgres://localhost/leftover_test \
//!     cargo test -p leftover-integration-tests
//! ```
//!
//! [`TestApp`] drives the real router with `tower::ServiceExt::oneshot`, so no
//! socket is bound. Codes sent by `/register/send-sms` are captured by a
//! [`RecordingDelivery`] instead of being logged.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use leftover_api::services::purchase::PurchaseSettings;
use leftover_api::services::tokens::TokenIssuer;
use leftover_api::services::verification::{
    CachedCodeStore, CodeDelivery, CodeVerifier, DeliveryFuture,
};
use leftover_api::state::AppState;
use leftover_api::store::Storage;
use leftover_api::store::memory::MemoryStore;
use leftover_core::{OneTimeCode, PhoneNumber};

/// Env var that enables the `PostgreSQL` tests.
pub const TEST_DATABASE_URL_VAR: &str = "LEFTOVER_TEST_DATABASE_URL";

const TEST_JWT_SECRET: &str = "k8Qz2LmW9vRt4YpX7nBc3HdJ6fGs1AeU";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Captures delivered codes so tests can read them back.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(PhoneNumber, OneTimeCode)>>,
}

impl RecordingDelivery {
    /// The most recent code sent to `phone`.
    ///
    /// # Panics
    ///
    /// Panics if `phone` is not a valid phone number.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn last_code(&self, phone: &str) -> Option<String> {
        let phone = PhoneNumber::parse(phone).expect("test phone must be valid");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(to, _)| *to == phone)
            .map(|(_, code)| code.as_str().to_owned())
    }

    /// Number of codes sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl CodeDelivery for RecordingDelivery {
    fn deliver<'a>(&'a self, phone: &'a PhoneNumber, code: &'a OneTimeCode) -> DeliveryFuture<'a> {
        Box::pin(async move {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((phone.clone(), code.clone()));
            Ok(())
        })
    }
}

/// A response as seen by a client.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `error` message of an error body, or empty.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// The full router over a storage backend, plus handles for assertions.
pub struct TestApp<S = MemoryStore> {
    router: Router,
    pub store: S,
    pub delivery: Arc<RecordingDelivery>,
    pub tokens: TokenIssuer,
}

impl TestApp<MemoryStore> {
    /// App over a fresh in-memory store with default time limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// App over a fresh in-memory store with a custom code validity window.
    #[must_use]
    pub fn with_code_ttl(code_ttl: Duration) -> Self {
        Self::build(MemoryStore::new(), code_ttl)
    }
}

impl Default for TestApp<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> TestApp<S> {
    /// App over `store` with default time limits.
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self::build(store, CodeVerifier::<CachedCodeStore>::DEFAULT_TTL)
    }

    fn build(store: S, code_ttl: Duration) -> Self {
        let secret = SecretString::from(TEST_JWT_SECRET);
        let delivery = Arc::new(RecordingDelivery::default());
        let state = AppState::new(
            store.clone(),
            TokenIssuer::new(&secret, Duration::from_secs(3600)),
            CodeVerifier::new(
                CachedCodeStore::new(code_ttl, CachedCodeStore::DEFAULT_CAPACITY),
                Arc::clone(&delivery) as Arc<dyn CodeDelivery>,
                code_ttl,
            ),
            PurchaseSettings::default(),
        );

        Self {
            router: leftover_api::app(state, REQUEST_TIMEOUT),
            store,
            delivery,
            tokens: TokenIssuer::new(&secret, Duration::from_secs(3600)),
        }
    }

    /// Send a request and collect the JSON body (`Null` when empty).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::expect_used)]
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request must build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body must be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body must be JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send("POST", uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str) -> TestResponse {
        self.send("PUT", uri, None, None).await
    }

    /// Log in with an external credential; returns `(token, user_id)`.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    pub async fn login(&self, provider: &str, subject: &str) -> (String, String) {
        let res = self
            .post(
                "/login",
                json!({ "auth_provider": provider, "auth_id": subject }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {:?}", res.body);
        (
            res.body["token"].as_str().unwrap_or_default().to_owned(),
            res.body["user_id"].as_str().unwrap_or_default().to_owned(),
        )
    }

    /// Log in a new user and give them a shop profile; returns the user id.
    ///
    /// # Panics
    ///
    /// Panics if any step is rejected.
    pub async fn merchant(&self, subject: &str, shop_name: &str) -> String {
        let (_, user_id) = self.login("google", subject).await;
        let res = self
            .post(
                "/merchant/setup",
                json!({
                    "user_id": user_id,
                    "shop_name": shop_name,
                    "address": "No. 7, Section 5, Xinyi Road, Taipei",
                    "latitude": 25.0335,
                    "longitude": 121.5650,
                    "category": "bakery",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "setup failed: {:?}", res.body);
        user_id
    }

    /// Publish a listing near Taipei 101; returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the listing is rejected.
    pub async fn listing(&self, merchant_id: &str, name: &str, expiry_minutes: i64) -> i64 {
        let res = self
            .post(
                "/products",
                json!({
                    "merchant_id": merchant_id,
                    "name": name,
                    "original_price": 200,
                    "current_price": 100,
                    "expiry_minutes": expiry_minutes,
                    "latitude": 25.0335,
                    "longitude": 121.5650,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "listing failed: {:?}", res.body);
        res.body["id"].as_i64().unwrap_or_default()
    }

    /// Attempt to buy `listing_id` as `consumer_id`.
    pub async fn purchase(&self, listing_id: i64, consumer_id: &str) -> TestResponse {
        self.post(
            &format!("/purchase/{listing_id}"),
            json!({ "consumer_id": consumer_id }),
        )
        .await
    }
}
