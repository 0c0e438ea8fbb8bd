//! Review routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::models::Review;
use crate::routes::path_user_id;
use crate::services::social::{ReviewDraft, SocialLedger};
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /reviews`.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub order_id: i32,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub merchant_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MerchantReviewsResponse {
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    pub total_reviews: i64,
}

/// POST /reviews
///
/// # Errors
///
/// Returns 400 for a rating outside 1-5 and 404 for an unknown order, user or
/// merchant.
pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = SocialLedger::new(state.store())
        .create_review(ReviewDraft {
            order_id: req.order_id,
            user_id: req.user_id,
            merchant_id: req.merchant_id,
            rating: req.rating,
            comment: req.comment,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review created", "id": id })),
    ))
}

/// GET /reviews/merchant/{merchant_id}
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn for_merchant<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(merchant_id): ApiPath<String>,
) -> Result<Json<MerchantReviewsResponse>> {
    let merchant_id = path_user_id(&merchant_id)?;
    let reviews = SocialLedger::new(state.store())
        .merchant_reviews(&merchant_id)
        .await?;

    Ok(Json(MerchantReviewsResponse {
        reviews: reviews.reviews,
        average_rating: reviews.summary.average,
        total_reviews: reviews.summary.count,
    }))
}
