//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leftover_core::{PhoneNumber, UserId};

use super::{PgStore, RepositoryError, parse_column};
use crate::models::{NewUser, User};
use crate::store::UserStore;

const USER_COLUMNS: &str =
    "id, auth_provider, auth_id, email, phone, wallet_address, is_merchant, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    auth_provider: String,
    auth_id: String,
    email: Option<String>,
    phone: Option<String>,
    wallet_address: Option<String>,
    is_merchant: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let phone = row
            .phone
            .as_deref()
            .map(|p| parse_column("phone", PhoneNumber::parse(p)))
            .transpose()?;

        Ok(Self {
            id: row.id,
            auth_provider: row.auth_provider,
            auth_id: row.auth_id,
            email: row.email,
            phone,
            wallet_address: row.wallet_address,
            is_merchant: row.is_merchant,
            created_at: row.created_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored phone is invalid.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by login key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_credential(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE auth_provider = $1 AND auth_id = $2"
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the login key or id already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (id, auth_provider, auth_id, email, phone, wallet_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&user.id)
        .bind(user.credential.provider())
        .bind(user.credential.subject())
        .bind(user.email.as_deref())
        .bind(user.credential.phone().map(PhoneNumber::as_str))
        .bind(user.wallet_address.as_deref())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}

impl UserStore for PgStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(self.pool()).get_by_id(id).await
    }

    async fn find_by_credential(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(self.pool())
            .get_by_credential(provider, subject)
            .await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(self.pool()).create(user).await
    }
}
