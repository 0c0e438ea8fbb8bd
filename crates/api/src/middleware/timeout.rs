//! Request-level timeout.
//!
//! Bounds every request, including one stuck behind a purchase lock. A request
//! that runs out of time is dropped and answered with a retryable 503.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Middleware that cancels a request after `limit`.
///
/// Install with `axum::middleware::from_fn_with_state(limit, timeout_middleware)`.
pub async fn timeout_middleware(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => AppError::Unavailable("Request timed out, please retry".to_string()).into_response(),
    }
}
