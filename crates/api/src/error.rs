//! Unified error handling with Sentry integration.
//!
//! Service errors convert into [`AppError`], which captures server-side
//! failures to Sentry before responding. Every error response has the body
//! `{"error": "<message>"}`. All route handlers return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use leftover_core::{CredentialError, PhoneError};

use crate::db::RepositoryError;
use crate::services::identity::IdentityError;
use crate::services::listings::ListingError;
use crate::services::merchants::MerchantError;
use crate::services::purchase::PurchaseError;
use crate::services::social::SocialError;
use crate::services::tokens::TokenError;
use crate::services::verification::VerificationError;

/// Application-level error type for the HTTP service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated, or a code did not verify.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The listing can no longer be bought (already sold or expired).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A retryable timeout (lock wait or purchase deadline).
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // Sold and expired listings keep the 400 clients already handle.
            Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Unavailable(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Unavailable(_)) {
            tracing::warn!(error = %self, "Request timed out");
        }

        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Conversions from service errors
// =============================================================================

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Repository(e) => Self::Database(e),
            e @ IdentityError::Unresolved { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(e) => Self::Internal(format!("token signing failed: {e}")),
            TokenError::Expired | TokenError::Invalid(_) => {
                Self::Unauthorized("Invalid or expired token".to_string())
            }
        }
    }
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::MalformedCode(e) => Self::BadRequest(e.to_string()),
            e @ (VerificationError::NoCodeRequested
            | VerificationError::Expired
            | VerificationError::InvalidCode) => Self::Unauthorized(e.to_string()),
        }
    }
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::Repository(e) => Self::Database(e),
            e @ ListingError::MerchantNotFound => Self::NotFound(e.to_string()),
            e => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Repository(e) => Self::Database(e),
            e @ (PurchaseError::NotFound | PurchaseError::ConsumerNotFound) => {
                Self::NotFound(e.to_string())
            }
            e @ (PurchaseError::AlreadySold | PurchaseError::Expired) => {
                Self::Conflict(e.to_string())
            }
            e @ (PurchaseError::Busy | PurchaseError::DeadlineExceeded) => {
                Self::Unavailable(e.to_string())
            }
        }
    }
}

impl From<MerchantError> for AppError {
    fn from(err: MerchantError) -> Self {
        match err {
            MerchantError::Repository(e) => Self::Database(e),
            e @ (MerchantError::UserNotFound | MerchantError::NotFound) => {
                Self::NotFound(e.to_string())
            }
            e => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<SocialError> for AppError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::Repository(e) => Self::Database(e),
            e @ (SocialError::UnknownReference(_) | SocialError::NotificationNotFound) => {
                Self::NotFound(e.to_string())
            }
            e => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PhoneError> for AppError {
    fn from(err: PhoneError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("purchase", "Purchase attempted", Some(&[("listing_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
