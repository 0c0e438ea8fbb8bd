//! The purchase coordinator.
//!
//! A purchase moves one listing from `AVAILABLE` to `SOLD` and records exactly
//! one order, inside a single transaction:
//!
//! 1. begin
//! 2. lock the listing row (exclusive, bounded wait)
//! 3. read status and expiry under the lock
//! 4. reject missing, expired or sold listings
//! 5. mark the listing sold
//! 6. insert the order
//! 7. commit
//!
//! Any early return drops the transaction, which rolls it back. The row lock
//! serialises competing buyers, so only the first to commit sees `AVAILABLE`.
//!
//! The deadline covers steps 1 to 6 only. Once the commit has been sent its
//! outcome is awaited in full, so a buyer is never told to retry a purchase
//! that went through.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use leftover_core::{ListingId, ListingStatus, UserId};

use crate::models::{LockedListing, NewNotification, NewOrder, Order};
use crate::store::{ClaimTransaction, NotificationStore, PurchaseLedger, RepositoryError};

/// Errors from a purchase attempt.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Product not found")]
    NotFound,

    #[error("Product already sold")]
    AlreadySold,

    #[error("Product expired")]
    Expired,

    #[error("Consumer not found")]
    ConsumerNotFound,

    /// Another purchase held the listing longer than the lock wait.
    #[error("Product is being purchased by someone else, please retry")]
    Busy,

    /// The whole attempt ran past its deadline and was rolled back.
    #[error("Purchase timed out, please retry")]
    DeadlineExceeded,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PurchaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::LockTimeout => Self::Busy,
            other => Self::Repository(other),
        }
    }
}

/// Time limits for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseSettings {
    /// Longest wait for the listing's row lock.
    pub lock_timeout: Duration,
    /// Deadline for the claim up to commit, lock wait included.
    pub deadline: Duration,
}

impl Default for PurchaseSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(15),
        }
    }
}

/// Claims listings for consumers.
pub struct PurchaseCoordinator<'a, S> {
    store: &'a S,
    settings: PurchaseSettings,
}

impl<'a, S> PurchaseCoordinator<'a, S>
where
    S: PurchaseLedger + NotificationStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S, settings: PurchaseSettings) -> Self {
        Self { store, settings }
    }

    /// Buy `listing_id` for `consumer_id`.
    ///
    /// On success the order is committed; the consumer and merchant are then
    /// notified on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Expired`, `AlreadySold` or `ConsumerNotFound` when
    /// the claim is rejected, `Busy` / `DeadlineExceeded` when it timed out, and
    /// `Repository` for storage failures. Nothing is written in any error case.
    pub async fn purchase(&self, listing_id: ListingId, consumer_id: &UserId) -> Result<Order, PurchaseError> {
        self.purchase_at(listing_id, consumer_id, Utc::now()).await
    }

    /// [`purchase`](Self::purchase) judging expiry at `now`.
    ///
    /// # Errors
    ///
    /// See [`purchase`](Self::purchase).
    pub async fn purchase_at(
        &self,
        listing_id: ListingId,
        consumer_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Order, PurchaseError> {
        let (tx, order, listing) =
            tokio::time::timeout(self.settings.deadline, self.claim(listing_id, consumer_id, now))
                .await
                .map_err(|_| {
                    warn!(listing_id = %listing_id, "Purchase deadline exceeded, rolled back");
                    PurchaseError::DeadlineExceeded
                })??;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            listing_id = %listing_id,
            consumer_id = %consumer_id,
            "Purchase committed"
        );
        self.notify(&order, &listing).await;
        Ok(order)
    }

    async fn claim(
        &self,
        listing_id: ListingId,
        consumer_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(S::Tx, Order, LockedListing), PurchaseError> {
        let mut tx = self.store.begin().await?;

        let listing = tx
            .lock_listing(listing_id, self.settings.lock_timeout)
            .await?
            .ok_or(PurchaseError::NotFound)?;

        // Expiry is checked first: an expired listing is reported as expired
        // whatever its status.
        if now >= listing.expires_at {
            return Err(PurchaseError::Expired);
        }
        if listing.status == ListingStatus::Sold {
            return Err(PurchaseError::AlreadySold);
        }

        tx.mark_sold(listing_id).await?;
        let order = tx
            .insert_order(NewOrder {
                listing_id,
                consumer_id: consumer_id.clone(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::MissingReference(_) => PurchaseError::ConsumerNotFound,
                other => other.into(),
            })?;

        Ok((tx, order, listing))
    }

    /// Post-commit notifications. Failures are logged and swallowed.
    async fn notify(&self, order: &Order, listing: &LockedListing) {
        let notifications = [
            NewNotification {
                user_id: order.consumer_id.clone(),
                title: "Purchase confirmed".to_owned(),
                body: Some(format!(
                    "Order #{} for {} is confirmed. Pick it up before it expires.",
                    order.id, listing.name
                )),
                kind: "order".to_owned(),
            },
            NewNotification {
                user_id: listing.merchant_id.clone(),
                title: "New sale".to_owned(),
                body: Some(format!("{} was sold (order #{}).", listing.name, order.id)),
                kind: "sale".to_owned(),
            },
        ];

        for notification in notifications {
            let user_id = notification.user_id.clone();
            if let Err(e) = self.store.create_notification(notification).await {
                warn!(
                    error = %e,
                    order_id = %order.id,
                    user_id = %user_id,
                    "Failed to create purchase notification"
                );
            }
        }
    }
}
