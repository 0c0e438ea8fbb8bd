//! Bearer token authentication.
//!
//! Provides an extractor for route handlers that need the caller's identity.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use leftover_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;
use crate::store::Storage;

/// Extractor that requires a valid session token.
///
/// Reads `Authorization: Bearer <token>` and verifies it with the state's
/// [`TokenIssuer`](crate::services::tokens::TokenIssuer). Missing, malformed,
/// expired or foreign tokens are rejected with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(AuthUser { user_id, .. }: AuthUser) -> String {
///     user_id.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    /// Merchant flag as of token issue.
    pub is_merchant: bool,
}

impl<S: Storage> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.tokens().verify(token)?;
        let user_id = claims.user_id()?;

        Span::current().record("user_id", user_id.as_str());
        set_sentry_user(&user_id);

        Ok(Self {
            user_id,
            is_merchant: claims.is_merchant,
        })
    }
}

/// The token of an `Authorization: Bearer` header, if well formed.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
