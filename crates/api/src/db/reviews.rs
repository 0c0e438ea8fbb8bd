//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leftover_core::{OrderId, Rating, ReviewId, UserId};

use super::{PgStore, RepositoryError, parse_column};
use crate::models::{NewReview, RatingSummary, Review};
use crate::store::ReviewStore;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    order_id: OrderId,
    user_id: UserId,
    merchant_id: UserId,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            merchant_id: row.merchant_id,
            rating: parse_column("rating", Rating::new(i64::from(row.rating)))?,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    average: f64,
    count: i64,
}

/// Repository for merchant reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the order, user or merchant
    /// does not exist.
    pub async fn create(&self, review: NewReview) -> Result<ReviewId, RepositoryError> {
        let id: ReviewId = sqlx::query_scalar(
            r"
            INSERT INTO reviews (order_id, user_id, merchant_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(review.order_id)
        .bind(&review.user_id)
        .bind(&review.merchant_id)
        .bind(i32::from(review.rating))
        .bind(review.comment.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// All reviews of a merchant, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_merchant(&self, merchant_id: &UserId) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT id, order_id, user_id, merchant_id, rating, comment, created_at
            FROM reviews
            WHERE merchant_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(merchant_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    /// Average rating (0 when none) and review count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, merchant_id: &UserId) -> Result<RatingSummary, RepositoryError> {
        let row: SummaryRow = sqlx::query_as(
            r"
            SELECT COALESCE(AVG(rating)::float8, 0) AS average, COUNT(*) AS count
            FROM reviews
            WHERE merchant_id = $1
            ",
        )
        .bind(merchant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(RatingSummary {
            average: row.average,
            count: row.count,
        })
    }
}

impl ReviewStore for PgStore {
    async fn create_review(&self, review: NewReview) -> Result<ReviewId, RepositoryError> {
        ReviewRepository::new(self.pool()).create(review).await
    }

    async fn reviews_for_merchant(&self, merchant_id: &UserId) -> Result<Vec<Review>, RepositoryError> {
        ReviewRepository::new(self.pool()).for_merchant(merchant_id).await
    }

    async fn rating_summary(&self, merchant_id: &UserId) -> Result<RatingSummary, RepositoryError> {
        ReviewRepository::new(self.pool()).summary(merchant_id).await
    }
}
