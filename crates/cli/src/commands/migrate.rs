//! Database migration command.
//!
//! Applies `crates/api/migrations/*.sql` in order. Already applied migrations
//! are skipped, so re-running is harmless.

use leftover_api::config::{ConfigError, get_database_url};
use leftover_api::db;
use thiserror::Error;
use tracing::info;

/// Env var holding the connection string (falls back to `DATABASE_URL`).
pub const DATABASE_URL_VAR: &str = "LEFTOVER_DATABASE_URL";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = get_database_url(DATABASE_URL_VAR)?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
