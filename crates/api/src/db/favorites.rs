//! Favorite merchants repository.

use sqlx::PgPool;

use leftover_core::{FavoriteId, UserId};

use super::{PgStore, RepositoryError};
use crate::models::FavoriteMerchant;
use crate::store::FavoriteStore;

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: FavoriteId,
    merchant_id: UserId,
    shop_name: String,
    address: String,
    category: Option<String>,
}

/// Repository for user favorites.
pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Remove the favorite if present, otherwise add it.
    ///
    /// Returns whether the merchant is a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the user or merchant
    /// profile does not exist.
    pub async fn toggle(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND merchant_id = $2")
            .bind(user_id)
            .bind(merchant_id)
            .execute(&mut *tx)
            .await?;

        let is_favorite = if removed.rows_affected() > 0 {
            false
        } else {
            sqlx::query(
                r"
                INSERT INTO favorites (user_id, merchant_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, merchant_id) DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(merchant_id)
            .execute(&mut *tx)
            .await?;
            true
        };

        tx.commit().await?;
        Ok(is_favorite)
    }

    /// Favorites joined with the merchant profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: &UserId) -> Result<Vec<FavoriteMerchant>, RepositoryError> {
        let rows: Vec<FavoriteRow> = sqlx::query_as(
            r"
            SELECT f.id, f.merchant_id, m.shop_name, m.address, m.category
            FROM favorites f
            JOIN merchants m ON m.user_id = f.merchant_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC, f.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| FavoriteMerchant {
                id: r.id,
                merchant_id: r.merchant_id,
                shop_name: r.shop_name,
                address: r.address,
                category: r.category,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND merchant_id = $2)",
        )
        .bind(user_id)
        .bind(merchant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

impl FavoriteStore for PgStore {
    async fn toggle_favorite(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        FavoriteRepository::new(self.pool())
            .toggle(user_id, merchant_id)
            .await
    }

    async fn favorites_for_user(&self, user_id: &UserId) -> Result<Vec<FavoriteMerchant>, RepositoryError> {
        FavoriteRepository::new(self.pool()).for_user(user_id).await
    }

    async fn is_favorite(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        FavoriteRepository::new(self.pool())
            .exists(user_id, merchant_id)
            .await
    }
}
