//! Login and phone verification routes.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{Span, info};

use leftover_core::{Credential, PhoneNumber, UserId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::services::identity::{IdentityResolver, LoginAttributes};
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub auth_provider: String,
    #[serde(default)]
    pub auth_id: String,
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
    pub is_merchant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneNumber>,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifySmsRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: UserId,
    pub is_merchant: bool,
}

/// Log in with an external credential, creating the user on first login.
///
/// POST /login
///
/// # Errors
///
/// Returns 400 for a missing or reserved provider or id.
pub async fn login<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let credential = Credential::external(&req.auth_provider, &req.auth_id)?;
    let attributes = LoginAttributes {
        email: non_blank(req.email),
        wallet_address: non_blank(req.wallet_address),
    };

    let user = IdentityResolver::new(state.store())
        .resolve(credential, attributes)
        .await?;
    let token = state.tokens().issue(&user)?;

    Span::current().record("user_id", user.id.as_str());
    add_breadcrumb("auth", "Logged in", Some(&[("provider", user.auth_provider.as_str())]));

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        is_merchant: user.is_merchant,
        phone: None,
    }))
}

/// Issue a one-time code for a phone number.
///
/// POST /register/send-sms
///
/// # Errors
///
/// Returns 400 for an implausible phone number.
pub async fn send_sms<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<SendSmsRequest>,
) -> Result<Json<Value>> {
    let phone = PhoneNumber::parse(&req.phone)?;
    state.verifier().issue(&phone).await;

    Ok(Json(json!({
        "message": "Verification code sent",
        "demo": true,
    })))
}

/// Verify a one-time code and log in as the phone's user.
///
/// POST /register/verify-sms
///
/// # Errors
///
/// Returns 400 for a malformed phone or code and 401 when the code does not verify.
pub async fn verify_sms<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<VerifySmsRequest>,
) -> Result<Json<LoginResponse>> {
    let phone = PhoneNumber::parse(&req.phone)?;
    state.verifier().verify(&phone, req.code.trim()).await?;

    let user = IdentityResolver::new(state.store())
        .resolve(Credential::Phone(phone.clone()), LoginAttributes::default())
        .await?;
    let token = state.tokens().issue(&user)?;

    Span::current().record("user_id", user.id.as_str());
    info!(user_id = %user.id, phone = %phone.masked(), "Phone login");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        is_merchant: user.is_merchant,
        phone: Some(phone),
    }))
}

/// The caller's identity, read fresh so a new merchant profile shows up.
///
/// GET /me
///
/// # Errors
///
/// Returns 401 without a valid token or when the user no longer exists.
pub async fn me<S: Storage>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
) -> Result<Json<MeResponse>> {
    let user = state
        .store()
        .find_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

    Ok(Json(MeResponse {
        user_id: user.id,
        is_merchant: user.is_merchant,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
