//! Notification repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leftover_core::{NotificationId, UserId};

use super::{PgStore, RepositoryError};
use crate::models::{NewNotification, Notification};
use crate::store::NotificationStore;

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    title: String,
    body: Option<String>,
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            body: row.body,
            kind: row.kind,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Repository for in-app notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the user does not exist.
    pub async fn create(&self, notification: NewNotification) -> Result<NotificationId, RepositoryError> {
        let id: NotificationId = sqlx::query_scalar(
            r"
            INSERT INTO notifications (user_id, title, body, type)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(notification.body.as_deref())
        .bind(&notification.kind)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, user_id: &UserId, limit: i64) -> Result<Vec<Notification>, RepositoryError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, user_id, title, body, type AS kind, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        let updated = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }
}

impl NotificationStore for PgStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, RepositoryError> {
        NotificationRepository::new(self.pool()).create(notification).await
    }

    async fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        NotificationRepository::new(self.pool())
            .recent(user_id, limit)
            .await
    }

    async fn unread_count(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        NotificationRepository::new(self.pool())
            .unread_count(user_id)
            .await
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        NotificationRepository::new(self.pool()).mark_read(id).await
    }
}
