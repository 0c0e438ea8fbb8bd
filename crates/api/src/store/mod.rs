//! Storage traits.
//!
//! Services receive their storage handle explicitly and only see these traits.
//! Two backends implement them:
//!
//! - [`crate::db::PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`memory::MemoryStore`] - in-process tables with the same locking and
//!   transaction semantics (tests, local demo)
//!
//! Every method returns a `Send` future so generic axum handlers stay `Send`.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use leftover_core::{ListingId, NotificationId, ReviewId, UserId};

pub use crate::db::RepositoryError;
use crate::models::{
    FavoriteMerchant, Listing, ListingFilter, LockedListing, MerchantProfile, MerchantSearch,
    MerchantStats, MerchantSummary, NewListing, NewNotification, NewOrder, NewReview, NewUser,
    Notification, Order, RatingSummary, Review, User,
};

/// User identities.
pub trait UserStore {
    fn find_user(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Look up a user by the `(provider, subject)` login key.
    fn find_by_credential(
        &self,
        provider: &str,
        subject: &str,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the login key is already taken.
    fn insert_user(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

/// Merchant profiles.
pub trait MerchantStore {
    /// Create or replace a profile and set the owner's merchant flag, atomically.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    fn upsert_profile(
        &self,
        profile: MerchantProfile,
    ) -> impl Future<Output = Result<MerchantProfile, RepositoryError>> + Send;

    fn get_profile(
        &self,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<Option<MerchantProfile>, RepositoryError>> + Send;

    fn search_merchants(
        &self,
        search: MerchantSearch,
    ) -> impl Future<Output = Result<Vec<MerchantSummary>, RepositoryError>> + Send;

    fn merchant_stats(
        &self,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<MerchantStats, RepositoryError>> + Send;
}

/// Listing creation and browsing.
pub trait ListingStore {
    /// Insert a listing as `AVAILABLE` and listed.
    fn create_listing(
        &self,
        listing: NewListing,
    ) -> impl Future<Output = Result<Listing, RepositoryError>> + Send;

    /// Listed, `AVAILABLE` listings with `expires_at > now`, soonest expiry first.
    fn list_available(
        &self,
        now: DateTime<Utc>,
        filter: ListingFilter,
    ) -> impl Future<Output = Result<Vec<Listing>, RepositoryError>> + Send;
}

/// Source of claim transactions for the purchase flow.
pub trait PurchaseLedger {
    type Tx: ClaimTransaction;

    /// Start a transaction. Dropping it without [`ClaimTransaction::commit`]
    /// rolls it back.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;
}

/// A transaction that can move one listing from `AVAILABLE` to `SOLD`.
pub trait ClaimTransaction: Send {
    /// Take the exclusive row lock on a listing and read it.
    ///
    /// Blocks while another transaction holds the lock, for at most `wait`;
    /// past that returns `RepositoryError::LockTimeout`. The lock is held until
    /// commit or rollback. Returns `None` if the listing does not exist.
    fn lock_listing(
        &mut self,
        id: ListingId,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<LockedListing>, RepositoryError>> + Send;

    fn mark_sold(
        &mut self,
        id: ListingId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Returns `RepositoryError::MissingReference` if the consumer does not exist.
    fn insert_order(
        &mut self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

pub trait ReviewStore {
    /// Returns `RepositoryError::MissingReference` for an unknown order, user or
    /// merchant.
    fn create_review(
        &self,
        review: NewReview,
    ) -> impl Future<Output = Result<ReviewId, RepositoryError>> + Send;

    /// Newest first.
    fn reviews_for_merchant(
        &self,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<Vec<Review>, RepositoryError>> + Send;

    fn rating_summary(
        &self,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<RatingSummary, RepositoryError>> + Send;
}

pub trait FavoriteStore {
    /// Flip membership of `merchant_id` in the user's favorites.
    ///
    /// Returns whether the merchant is a favorite afterwards.
    fn toggle_favorite(
        &self,
        user_id: &UserId,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Newest first, only merchants that have a profile.
    fn favorites_for_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<FavoriteMerchant>, RepositoryError>> + Send;

    fn is_favorite(
        &self,
        user_id: &UserId,
        merchant_id: &UserId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

pub trait NotificationStore {
    fn create_notification(
        &self,
        notification: NewNotification,
    ) -> impl Future<Output = Result<NotificationId, RepositoryError>> + Send;

    /// At most `limit` notifications, newest first.
    fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Notification>, RepositoryError>> + Send;

    fn unread_count(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Returns `false` if no such notification exists.
    fn mark_read(
        &self,
        id: NotificationId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Everything the HTTP service needs from a backend.
pub trait Storage:
    UserStore
    + MerchantStore
    + ListingStore
    + PurchaseLedger
    + ReviewStore
    + FavoriteStore
    + NotificationStore
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Readiness check.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
