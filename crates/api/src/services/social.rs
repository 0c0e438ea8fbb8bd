//! Reviews, favorites and notifications.
//!
//! Independent of the purchase path: these only reference users, merchants and
//! orders, and rely on the store for referential checks.

use thiserror::Error;
use tracing::{debug, info};

use leftover_core::{NotificationId, OrderId, Rating, RatingError, ReviewId, UserId};

use crate::models::{
    FavoriteMerchant, NewNotification, NewReview, Notification, RatingSummary, Review,
};
use crate::store::{FavoriteStore, NotificationStore, RepositoryError, ReviewStore};

/// Notifications returned by an inbox read.
pub const INBOX_LIMIT: i64 = 50;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_TEXT_LENGTH: usize = 2000;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} is too long")]
    TooLong(&'static str),

    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    /// A referenced user, merchant or order does not exist.
    #[error("{0} not found")]
    UnknownReference(&'static str),

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A review as submitted by a consumer.
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub order_id: i32,
    pub user_id: String,
    pub merchant_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

/// A notification as submitted by a caller.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub user_id: String,
    pub title: String,
    pub body: Option<String>,
    /// Defaults to [`NewNotification::DEFAULT_KIND`].
    pub kind: Option<String>,
}

/// A merchant's reviews with their aggregate.
#[derive(Debug, Clone)]
pub struct MerchantReviews {
    pub reviews: Vec<Review>,
    pub summary: RatingSummary,
}

/// A user's latest notifications and how many are unread overall.
#[derive(Debug, Clone)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub struct SocialLedger<'a, S> {
    store: &'a S,
}

impl<'a, S> SocialLedger<'a, S>
where
    S: ReviewStore + FavoriteStore + NotificationStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// # Errors
    ///
    /// Returns `InvalidRating` outside 1-5 and `UnknownReference` when the
    /// order, user or merchant does not exist.
    pub async fn create_review(&self, draft: ReviewDraft) -> Result<ReviewId, SocialError> {
        let rating = Rating::new(draft.rating)?;
        let review = NewReview {
            order_id: OrderId::new(draft.order_id),
            user_id: required_id("user_id", &draft.user_id)?,
            merchant_id: required_id("merchant_id", &draft.merchant_id)?,
            rating,
            comment: optional_text("comment", draft.comment, MAX_TEXT_LENGTH)?,
        };
        let merchant_id = review.merchant_id.clone();

        let id = self
            .store
            .create_review(review)
            .await
            .map_err(|e| dangling(e, "Order, user or merchant"))?;
        info!(review_id = %id, merchant_id = %merchant_id, rating = rating.get(), "Review created");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `SocialError::Repository` if storage fails.
    pub async fn merchant_reviews(&self, merchant_id: &UserId) -> Result<MerchantReviews, SocialError> {
        let reviews = self.store.reviews_for_merchant(merchant_id).await?;
        let summary = self.store.rating_summary(merchant_id).await?;
        Ok(MerchantReviews { reviews, summary })
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Flip the favorite; returns whether it is set afterwards.
    ///
    /// # Errors
    ///
    /// Returns `UnknownReference` when adding a favorite for an unknown user or
    /// merchant.
    pub async fn toggle_favorite(&self, user_id: &str, merchant_id: &str) -> Result<bool, SocialError> {
        let user_id = required_id("user_id", user_id)?;
        let merchant_id = required_id("merchant_id", merchant_id)?;

        let is_favorite = self
            .store
            .toggle_favorite(&user_id, &merchant_id)
            .await
            .map_err(|e| dangling(e, "User or merchant"))?;
        debug!(user_id = %user_id, merchant_id = %merchant_id, is_favorite, "Favorite toggled");
        Ok(is_favorite)
    }

    /// # Errors
    ///
    /// Returns `SocialError::Repository` if storage fails.
    pub async fn favorites(&self, user_id: &UserId) -> Result<Vec<FavoriteMerchant>, SocialError> {
        Ok(self.store.favorites_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `MissingField` if either id is blank.
    pub async fn is_favorite(&self, user_id: &str, merchant_id: &str) -> Result<bool, SocialError> {
        let user_id = required_id("user_id", user_id)?;
        let merchant_id = required_id("merchant_id", merchant_id)?;
        Ok(self.store.is_favorite(&user_id, &merchant_id).await?)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// # Errors
    ///
    /// Returns `MissingField` for a blank user or title and `UnknownReference`
    /// for an unknown user.
    pub async fn notify(&self, draft: NotificationDraft) -> Result<NotificationId, SocialError> {
        let user_id = required_id("user_id", &draft.user_id)?;
        let title = optional_text("title", Some(draft.title), MAX_TITLE_LENGTH)?
            .ok_or(SocialError::MissingField("title"))?;
        let kind = optional_text("type", draft.kind, MAX_TITLE_LENGTH)?
            .unwrap_or_else(|| NewNotification::DEFAULT_KIND.to_owned());

        let id = self
            .store
            .create_notification(NewNotification {
                user_id,
                title,
                body: optional_text("body", draft.body, MAX_TEXT_LENGTH)?,
                kind,
            })
            .await
            .map_err(|e| dangling(e, "User"))?;
        Ok(id)
    }

    /// The [`INBOX_LIMIT`] newest notifications and the total unread count.
    ///
    /// # Errors
    ///
    /// Returns `SocialError::Repository` if storage fails.
    pub async fn inbox(&self, user_id: &UserId) -> Result<Inbox, SocialError> {
        let notifications = self.store.recent_notifications(user_id, INBOX_LIMIT).await?;
        let unread_count = self.store.unread_count(user_id).await?;
        Ok(Inbox {
            notifications,
            unread_count,
        })
    }

    /// # Errors
    ///
    /// Returns `NotificationNotFound` for an unknown id.
    pub async fn mark_read(&self, id: NotificationId) -> Result<(), SocialError> {
        if self.store.mark_read(id).await? {
            Ok(())
        } else {
            Err(SocialError::NotificationNotFound)
        }
    }
}

fn required_id(field: &'static str, value: &str) -> Result<UserId, SocialError> {
    UserId::parse(value).ok_or(SocialError::MissingField(field))
}

fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, SocialError> {
    let value = value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty());
    if value.as_deref().is_some_and(|v| v.chars().count() > max) {
        return Err(SocialError::TooLong(field));
    }
    Ok(value)
}

fn dangling(e: RepositoryError, what: &'static str) -> SocialError {
    match e {
        RepositoryError::MissingReference(_) => SocialError::UnknownReference(what),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use leftover_core::Credential;

    use super::*;
    use crate::models::{MerchantProfile, NewUser};
    use crate::store::memory::MemoryStore;
    use crate::store::{MerchantStore, UserStore};

    async fn user(store: &MemoryStore, subject: &str) -> UserId {
        store
            .insert_user(NewUser {
                id: UserId::generate(),
                credential: Credential::external("google", subject).unwrap(),
                email: None,
                wallet_address: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn merchant(store: &MemoryStore) -> UserId {
        let id = user(store, "shop").await;
        store
            .upsert_profile(MerchantProfile {
                user_id: id.clone(),
                shop_name: "Noodle Bar".to_owned(),
                address: "3 Side St".to_owned(),
                latitude: None,
                longitude: None,
                phone: None,
                email: None,
                business_hours_open: None,
                business_hours_close: None,
                category: Some("noodles".to_owned()),
                description: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_review_rating_bounds() {
        let store = MemoryStore::new();
        let ledger = SocialLedger::new(&store);

        for rating in [0, 6, -1] {
            let result = ledger
                .create_review(ReviewDraft {
                    order_id: 1,
                    user_id: "usr_a".to_owned(),
                    merchant_id: "usr_b".to_owned(),
                    rating,
                    comment: None,
                })
                .await;
            assert!(matches!(result, Err(SocialError::InvalidRating(_))));
        }
    }

    #[tokio::test]
    async fn test_review_requires_existing_order() {
        let store = MemoryStore::new();
        let consumer = user(&store, "eater").await;
        let shop = merchant(&store).await;

        let result = SocialLedger::new(&store)
            .create_review(ReviewDraft {
                order_id: 99,
                user_id: consumer.to_string(),
                merchant_id: shop.to_string(),
                rating: 5,
                comment: Some("great".to_owned()),
            })
            .await;
        assert!(matches!(result, Err(SocialError::UnknownReference(_))));
    }

    #[tokio::test]
    async fn test_favorite_toggles() {
        let store = MemoryStore::new();
        let consumer = user(&store, "eater").await;
        let shop = merchant(&store).await;
        let ledger = SocialLedger::new(&store);

        assert!(ledger.toggle_favorite(consumer.as_str(), shop.as_str()).await.unwrap());
        assert!(ledger.is_favorite(consumer.as_str(), shop.as_str()).await.unwrap());
        let favorites = ledger.favorites(&consumer).await.unwrap();
        assert_eq!(favorites.first().unwrap().shop_name, "Noodle Bar");

        assert!(!ledger.toggle_favorite(consumer.as_str(), shop.as_str()).await.unwrap());
        assert!(!ledger.is_favorite(consumer.as_str(), shop.as_str()).await.unwrap());
        assert!(ledger.favorites(&consumer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inbox_counts_unread() {
        let store = MemoryStore::new();
        let consumer = user(&store, "eater").await;
        let ledger = SocialLedger::new(&store);

        let first = ledger
            .notify(NotificationDraft {
                user_id: consumer.to_string(),
                title: "Hello".to_owned(),
                body: None,
                kind: None,
            })
            .await
            .unwrap();
        ledger
            .notify(NotificationDraft {
                user_id: consumer.to_string(),
                title: "Deal nearby".to_owned(),
                body: Some("50% off bento".to_owned()),
                kind: Some("promo".to_owned()),
            })
            .await
            .unwrap();
        ledger.mark_read(first).await.unwrap();

        let inbox = ledger.inbox(&consumer).await.unwrap();
        assert_eq!(inbox.unread_count, 1);
        assert_eq!(inbox.notifications.len(), 2);
        assert_eq!(inbox.notifications.first().unwrap().kind, "promo");
        assert_eq!(inbox.notifications.get(1).unwrap().kind, "general");
    }

    #[tokio::test]
    async fn test_mark_read_unknown_notification() {
        let store = MemoryStore::new();
        let result = SocialLedger::new(&store)
            .mark_read(NotificationId::new(7))
            .await;
        assert!(matches!(result, Err(SocialError::NotificationNotFound)));
    }
}
