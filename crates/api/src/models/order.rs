//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use leftover_core::{ListingId, ListingStatus, OrderId, OrderStatus, UserId};

/// Immutable purchase receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub listing_id: ListingId,
    pub consumer_id: UserId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub listing_id: ListingId,
    pub consumer_id: UserId,
}

/// The columns of a listing read under its row lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedListing {
    pub id: ListingId,
    pub merchant_id: UserId,
    pub name: String,
    pub status: ListingStatus,
    pub expires_at: DateTime<Utc>,
}
