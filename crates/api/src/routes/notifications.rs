//! Notification routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use leftover_core::NotificationId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::models::Notification;
use crate::routes::path_user_id;
use crate::services::social::{NotificationDraft, SocialLedger};
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /notifications`.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// POST /notifications
///
/// # Errors
///
/// Returns 400 for a missing user or title and 404 for an unknown user.
pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = SocialLedger::new(state.store())
        .notify(NotificationDraft {
            user_id: req.user_id,
            title: req.title,
            body: req.body,
            kind: req.kind,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Notification created", "id": id })),
    ))
}

/// The user's newest notifications and unread count.
///
/// GET /notifications/{id}, where `id` is the user id
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn inbox<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<InboxResponse>> {
    let user_id = path_user_id(&user_id)?;
    let inbox = SocialLedger::new(state.store()).inbox(&user_id).await?;

    Ok(Json(InboxResponse {
        notifications: inbox.notifications,
        unread_count: inbox.unread_count,
    }))
}

/// PUT /notifications/{id}/read
///
/// # Errors
///
/// Returns 404 for an unknown notification.
pub async fn mark_read<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Value>> {
    SocialLedger::new(state.store())
        .mark_read(NotificationId::new(id))
        .await?;

    Ok(Json(json!({ "message": "Notification marked as read" })))
}
