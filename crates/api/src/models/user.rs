//! User domain types.

use chrono::{DateTime, Utc};

use leftover_core::{Credential, PhoneNumber, UserId};

/// A marketplace user (consumer, merchant, or both).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Stable internal id.
    pub id: UserId,
    /// Provider half of the login key (`google`, `line`, `phone`, ...).
    pub auth_provider: String,
    /// Provider's id for the user, wallet address, or normalised phone.
    pub auth_id: String,
    /// Contact email, if the provider shared one.
    pub email: Option<String>,
    /// Verified phone number, for phone-authenticated users.
    pub phone: Option<PhoneNumber>,
    /// Crypto wallet address, if supplied at login.
    pub wallet_address: Option<String>,
    /// Whether the user has set up a merchant profile.
    pub is_merchant: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub credential: Credential,
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

impl NewUser {
    /// Build the user row this insert produces.
    ///
    /// Stores call this so every backend derives the same column values from a
    /// credential.
    #[must_use]
    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User {
            id: self.id,
            auth_provider: self.credential.provider().to_owned(),
            auth_id: self.credential.subject().to_owned(),
            phone: self.credential.phone().cloned(),
            email: self.email,
            wallet_address: self.wallet_address,
            is_merchant: false,
            created_at,
        }
    }
}
