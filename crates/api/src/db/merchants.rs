//! Merchant profile repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leftover_core::UserId;

use super::{PgStore, RepositoryError};
use crate::models::{MerchantProfile, MerchantSearch, MerchantStats, MerchantSummary};
use crate::store::{MerchantStore, escape_like};

const PROFILE_COLUMNS: &str = "user_id, shop_name, address, latitude, longitude, phone, email, \
     business_hours_open, business_hours_close, category, description, created_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: UserId,
    shop_name: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    phone: Option<String>,
    email: Option<String>,
    business_hours_open: Option<String>,
    business_hours_close: Option<String>,
    category: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for MerchantProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            shop_name: row.shop_name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            phone: row.phone,
            email: row.email,
            business_hours_open: row.business_hours_open,
            business_hours_close: row.business_hours_close,
            category: row.category,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    user_id: UserId,
    shop_name: String,
    address: String,
    category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    average_rating: f64,
    total_reviews: i64,
    product_count: i64,
}

/// Repository for merchant profiles.
pub struct MerchantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MerchantRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a profile and flag its owner as a merchant.
    ///
    /// Both writes happen in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(&self, profile: MerchantProfile) -> Result<MerchantProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let flagged = sqlx::query("UPDATE users SET is_merchant = TRUE WHERE id = $1")
            .bind(&profile.user_id)
            .execute(&mut *tx)
            .await?;
        if flagged.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let row: ProfileRow = sqlx::query_as(&format!(
            r"
            INSERT INTO merchants (user_id, shop_name, address, latitude, longitude, phone, email,
                                   business_hours_open, business_hours_close, category, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id) DO UPDATE
            SET shop_name = EXCLUDED.shop_name,
                address = EXCLUDED.address,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                business_hours_open = EXCLUDED.business_hours_open,
                business_hours_close = EXCLUDED.business_hours_close,
                category = EXCLUDED.category,
                description = EXCLUDED.description
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(&profile.user_id)
        .bind(&profile.shop_name)
        .bind(&profile.address)
        .bind(profile.latitude)
        .bind(profile.longitude)
        .bind(profile.phone.as_deref())
        .bind(profile.email.as_deref())
        .bind(profile.business_hours_open.as_deref())
        .bind(profile.business_hours_close.as_deref())
        .bind(profile.category.as_deref())
        .bind(profile.description.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Get a profile by its owner's id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, merchant_id: &UserId) -> Result<Option<MerchantProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM merchants WHERE user_id = $1"
        ))
        .bind(merchant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Search by shop name/address substring and exact category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, search: MerchantSearch) -> Result<Vec<MerchantSummary>, RepositoryError> {
        let pattern = search.query.as_deref().map(|q| format!("%{}%", escape_like(q)));

        let rows: Vec<SummaryRow> = sqlx::query_as(
            r"
            SELECT user_id, shop_name, address, category
            FROM merchants
            WHERE ($1::text IS NULL OR shop_name ILIKE $1 OR address ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY shop_name, user_id
            LIMIT $3
            ",
        )
        .bind(pattern)
        .bind(search.category)
        .bind(search.limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MerchantSummary {
                user_id: r.user_id,
                shop_name: r.shop_name,
                address: r.address,
                category: r.category,
            })
            .collect())
    }

    /// Review aggregates and available listing count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, merchant_id: &UserId) -> Result<MerchantStats, RepositoryError> {
        let row: StatsRow = sqlx::query_as(
            r"
            SELECT
                COALESCE((SELECT AVG(rating)::float8 FROM reviews WHERE merchant_id = $1), 0)
                    AS average_rating,
                (SELECT COUNT(*) FROM reviews WHERE merchant_id = $1) AS total_reviews,
                (SELECT COUNT(*) FROM products WHERE merchant_id = $1 AND status = 'AVAILABLE')
                    AS product_count
            ",
        )
        .bind(merchant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(MerchantStats {
            average_rating: row.average_rating,
            total_reviews: row.total_reviews,
            product_count: row.product_count,
        })
    }
}

impl MerchantStore for PgStore {
    async fn upsert_profile(&self, profile: MerchantProfile) -> Result<MerchantProfile, RepositoryError> {
        MerchantRepository::new(self.pool()).upsert(profile).await
    }

    async fn get_profile(&self, merchant_id: &UserId) -> Result<Option<MerchantProfile>, RepositoryError> {
        MerchantRepository::new(self.pool()).get(merchant_id).await
    }

    async fn search_merchants(
        &self,
        search: MerchantSearch,
    ) -> Result<Vec<MerchantSummary>, RepositoryError> {
        MerchantRepository::new(self.pool()).search(search).await
    }

    async fn merchant_stats(&self, merchant_id: &UserId) -> Result<MerchantStats, RepositoryError> {
        MerchantRepository::new(self.pool()).stats(merchant_id).await
    }
}
