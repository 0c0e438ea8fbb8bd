//! Merchant profile routes.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use leftover_core::UserId;

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{MerchantProfile, MerchantSummary};
use crate::services::merchants::{MerchantDirectory, ProfileDraft};
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /merchant/setup`.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub business_hours_open: Option<String>,
    pub business_hours_close: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl From<SetupRequest> for ProfileDraft {
    fn from(req: SetupRequest) -> Self {
        Self {
            user_id: req.user_id,
            shop_name: req.shop_name,
            address: req.address,
            latitude: req.latitude,
            longitude: req.longitude,
            phone: req.phone,
            email: req.email,
            business_hours_open: req.business_hours_open,
            business_hours_close: req.business_hours_close,
            category: req.category,
            description: req.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MerchantResponse {
    pub merchant: MerchantProfile,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub product_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

/// Create or replace the caller's shop profile.
///
/// POST /merchant/setup
///
/// # Errors
///
/// Returns 400 for missing fields and 404 for an unknown user.
pub async fn setup<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<SetupRequest>,
) -> Result<Json<Value>> {
    MerchantDirectory::new(state.store()).setup(req.into()).await?;

    Ok(Json(json!({ "message": "Merchant profile updated" })))
}

/// A merchant's profile with rating and product aggregates.
///
/// GET /merchant/{merchant_id}
///
/// # Errors
///
/// Returns 404 if the merchant has no profile.
pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(merchant_id): ApiPath<String>,
) -> Result<Json<MerchantResponse>> {
    let merchant_id =
        UserId::parse(&merchant_id).ok_or_else(|| AppError::NotFound("Merchant not found".to_string()))?;
    let details = MerchantDirectory::new(state.store())
        .details(&merchant_id)
        .await?;

    Ok(Json(MerchantResponse {
        merchant: details.profile,
        average_rating: details.stats.average_rating,
        total_reviews: details.stats.total_reviews,
        product_count: details.stats.product_count,
    }))
}

/// Search merchants by name, address and category.
///
/// GET /merchants/search?q=&category=
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn search<S: Storage>(
    State(state): State<AppState<S>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<MerchantSummary>>> {
    let results = MerchantDirectory::new(state.store())
        .search(query.q.as_deref(), query.category.as_deref())
        .await?;

    Ok(Json(results))
}
