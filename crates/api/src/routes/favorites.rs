//! Favorite merchant routes.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::FavoriteMerchant;
use crate::routes::path_user_id;
use crate::services::social::SocialLedger;
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /favorites/toggle`; also the `check` query.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub merchant_id: String,
}

/// POST /favorites/toggle
///
/// # Errors
///
/// Returns 400 for missing ids and 404 when adding an unknown user or merchant.
pub async fn toggle<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<FavoriteRequest>,
) -> Result<Json<Value>> {
    let is_favorite = SocialLedger::new(state.store())
        .toggle_favorite(&req.user_id, &req.merchant_id)
        .await?;

    let message = if is_favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(json!({ "message": message, "is_favorite": is_favorite })))
}

/// GET /favorites/{user_id}
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn for_user<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<FavoriteMerchant>>> {
    let user_id = path_user_id(&user_id)?;
    let favorites = SocialLedger::new(state.store())
        .favorites(&user_id)
        .await?;

    Ok(Json(favorites))
}

/// GET /favorites/check?user_id=&merchant_id=
///
/// # Errors
///
/// Returns 400 if either parameter is missing.
pub async fn check<S: Storage>(
    State(state): State<AppState<S>>,
    ApiQuery(query): ApiQuery<FavoriteRequest>,
) -> Result<Json<Value>> {
    let is_favorite = SocialLedger::new(state.store())
        .is_favorite(&query.user_id, &query.merchant_id)
        .await?;

    Ok(Json(json!({ "is_favorite": is_favorite })))
}
