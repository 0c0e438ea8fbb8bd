//! `PostgreSQL` storage backend.
//!
//! # Tables
//!
//! - `users` - Identities, unique on `(auth_provider, auth_id)`
//! - `merchants` - Shop profiles, 1:1 with merchant users
//! - `products` - Listings with price, location, expiry and status
//! - `orders` - One row per successful purchase (unique per product)
//! - `reviews`, `favorites`, `notifications` - Social features
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p leftover-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` rows), so the
//! crate builds without a live database.

pub mod favorites;
pub mod listings;
pub mod merchants;
pub mod notifications;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::store::Storage;

pub use listings::PgClaim;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation: a referenced row does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Gave up waiting for a row lock.
    #[error("lock wait timed out")]
    LockTimeout,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some("23505") => return Self::Conflict(db_err.message().to_owned()),
                Some("23503") => return Self::MissingReference(db_err.message().to_owned()),
                Some("55P03") => return Self::LockTimeout,
                _ => {}
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Storage handle over a `PostgreSQL` pool.
///
/// Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Storage for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse a text column into a domain value, reporting failures as corruption.
pub(crate) fn parse_column<T, E: std::fmt::Display>(
    column: &str,
    parsed: Result<T, E>,
) -> Result<T, RepositoryError> {
    parsed.map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}
