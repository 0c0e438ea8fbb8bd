//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::services::purchase::PurchaseSettings;
use crate::services::tokens::TokenIssuer;
use crate::services::verification::{CachedCodeStore, CodeDelivery, CodeVerifier};
use crate::store::Storage;

/// Application state shared across all handlers.
///
/// Generic over the storage backend so the same router serves `PostgreSQL`
/// in production and the in-memory store in tests. Cheaply cloneable via `Arc`.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    tokens: TokenIssuer,
    verifier: CodeVerifier<CachedCodeStore>,
    purchase: PurchaseSettings,
}

// Manual impl: deriving would require `S: Clone` on the handle type itself.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Storage> AppState<S> {
    /// Create a new application state from its parts.
    #[must_use]
    pub fn new(
        store: S,
        tokens: TokenIssuer,
        verifier: CodeVerifier<CachedCodeStore>,
        purchase: PurchaseSettings,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                tokens,
                verifier,
                purchase,
            }),
        }
    }

    /// Build the state described by `config`, sending codes through `delivery`.
    #[must_use]
    pub fn from_config(store: S, config: &ApiConfig, delivery: Arc<dyn CodeDelivery>) -> Self {
        let codes = CachedCodeStore::new(config.code_ttl, CachedCodeStore::DEFAULT_CAPACITY);

        Self::new(
            store,
            TokenIssuer::new(&config.jwt_secret, config.token_ttl),
            CodeVerifier::new(codes, delivery, config.code_ttl),
            config.purchase,
        )
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the session token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the one-time code verifier.
    #[must_use]
    pub fn verifier(&self) -> &CodeVerifier<CachedCodeStore> {
        &self.inner.verifier
    }

    /// Purchase lock wait and deadline.
    #[must_use]
    pub fn purchase_settings(&self) -> PurchaseSettings {
        self.inner.purchase
    }
}
