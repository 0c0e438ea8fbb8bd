//! Reviews, favorites and notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use leftover_core::{FavoriteId, NotificationId, OrderId, Rating, ReviewId, UserId};

/// A consumer's rating of a merchant, tied to an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub merchant_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub merchant_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
}

/// Average and count of a merchant's reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    /// 0 when there are no reviews.
    pub average: f64,
    pub count: i64,
}

/// A favorite joined with the merchant's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteMerchant {
    pub id: FavoriteId,
    pub merchant_id: UserId,
    pub shop_name: String,
    pub address: String,
    pub category: Option<String>,
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: String,
    pub body: Option<String>,
    pub kind: String,
}

impl NewNotification {
    /// Kind used when the caller does not pick one.
    pub const DEFAULT_KIND: &'static str = "general";
}
