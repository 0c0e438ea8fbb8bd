//! Listing repository and the row-locking claim transaction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use leftover_core::{Coordinates, ListingId, ListingStatus, OrderId, OrderStatus, Pricing, UserId};

use super::{PgStore, RepositoryError, parse_column};
use crate::models::{Listing, ListingFilter, LockedListing, NewListing, NewOrder, Order};
use crate::store::{ClaimTransaction, ListingStore, PurchaseLedger};

const LISTING_COLUMNS: &str = "id, merchant_id, name, original_price, current_price, expiry_date, \
     latitude, longitude, is_listed, status, created_at";

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: ListingId,
    merchant_id: UserId,
    name: String,
    original_price: Decimal,
    current_price: Decimal,
    expiry_date: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    is_listed: bool,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            merchant_id: row.merchant_id,
            name: row.name,
            pricing: parse_column(
                "price",
                Pricing::new(row.original_price, row.current_price),
            )?,
            expires_at: row.expiry_date,
            location: parse_column("location", Coordinates::new(row.latitude, row.longitude))?,
            is_listed: row.is_listed,
            status: parse_column("status", row.status.parse())?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LockedRow {
    id: ListingId,
    merchant_id: UserId,
    name: String,
    status: String,
    expiry_date: DateTime<Utc>,
}

impl TryFrom<LockedRow> for LockedListing {
    type Error = RepositoryError;

    fn try_from(row: LockedRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            merchant_id: row.merchant_id,
            name: row.name,
            status: parse_column("status", row.status.parse())?,
            expires_at: row.expiry_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    product_id: ListingId,
    consumer_id: UserId,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            listing_id: row.product_id,
            consumer_id: row.consumer_id,
            status: parse_column("order status", row.status.parse::<OrderStatus>())?,
            created_at: row.created_at,
        })
    }
}

/// Repository for listings outside the purchase path.
pub struct ListingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new `AVAILABLE`, listed product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the merchant user does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        let row: ListingRow = sqlx::query_as(&format!(
            r"
            INSERT INTO products (merchant_id, name, original_price, current_price, expiry_date,
                                  latitude, longitude, is_listed, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8)
            RETURNING {LISTING_COLUMNS}
            "
        ))
        .bind(&listing.merchant_id)
        .bind(&listing.name)
        .bind(listing.pricing.original)
        .bind(listing.pricing.current)
        .bind(listing.expires_at)
        .bind(listing.location.latitude)
        .bind(listing.location.longitude)
        .bind(ListingStatus::Available.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Listed, available, unexpired products, soonest expiry first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available(
        &self,
        now: DateTime<Utc>,
        filter: ListingFilter,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let bounds = filter.bounds;
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            r"
            SELECT {LISTING_COLUMNS}
            FROM products
            WHERE status = $1
              AND is_listed
              AND expiry_date > $2
              AND ($3::float8 IS NULL OR latitude BETWEEN $3 AND $4)
              AND ($5::float8 IS NULL OR longitude BETWEEN $5 AND $6)
            ORDER BY expiry_date, id
            LIMIT $7 OFFSET $8
            "
        ))
        .bind(ListingStatus::Available.as_str())
        .bind(now)
        .bind(bounds.map(|b| b.min_latitude))
        .bind(bounds.map(|b| b.max_latitude))
        .bind(bounds.map(|b| b.min_longitude))
        .bind(bounds.map(|b| b.max_longitude))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Listing::try_from).collect()
    }
}

impl ListingStore for PgStore {
    async fn create_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        ListingRepository::new(self.pool()).create(listing).await
    }

    async fn list_available(
        &self,
        now: DateTime<Utc>,
        filter: ListingFilter,
    ) -> Result<Vec<Listing>, RepositoryError> {
        ListingRepository::new(self.pool()).available(now, filter).await
    }
}

// =============================================================================
// Claim Transaction
// =============================================================================

/// A purchase transaction on a dedicated connection.
///
/// The row lock taken by [`ClaimTransaction::lock_listing`] is `SELECT ... FOR
/// UPDATE`, held until commit. Dropping the value returns the connection to the
/// pool and rolls back.
pub struct PgClaim {
    tx: Transaction<'static, Postgres>,
}

impl PurchaseLedger for PgStore {
    type Tx = PgClaim;

    async fn begin(&self) -> Result<PgClaim, RepositoryError> {
        Ok(PgClaim {
            tx: self.pool().begin().await?,
        })
    }
}

impl ClaimTransaction for PgClaim {
    async fn lock_listing(
        &mut self,
        id: ListingId,
        wait: Duration,
    ) -> Result<Option<LockedListing>, RepositoryError> {
        // lock_timeout = 0 disables the limit, so never send 0.
        let millis = wait.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{millis}ms'"))
            .execute(&mut *self.tx)
            .await?;

        let row: Option<LockedRow> = sqlx::query_as(
            "SELECT id, merchant_id, name, status, expiry_date FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(LockedListing::try_from).transpose()
    }

    async fn mark_sold(&mut self, id: ListingId) -> Result<(), RepositoryError> {
        let updated = sqlx::query("UPDATE products SET status = $1 WHERE id = $2")
            .bind(ListingStatus::Sold.as_str())
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO orders (product_id, consumer_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, consumer_id, status, created_at
            ",
        )
        .bind(order.listing_id)
        .bind(&order.consumer_id)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
