//! Listing (product) types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use leftover_core::{BoundingBox, Coordinates, ListingId, ListingStatus, Pricing, UserId};

/// A single sellable unit of surplus food.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub merchant_id: UserId,
    pub name: String,
    pub pricing: Pricing,
    pub expires_at: DateTime<Utc>,
    pub location: Coordinates,
    pub is_listed: bool,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Whether the listing can be bought at `now`.
    #[must_use]
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Available && self.expires_at > now
    }
}

/// Fields for creating a listing. Status and listed flag are implied.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub merchant_id: UserId,
    pub name: String,
    pub pricing: Pricing,
    pub expires_at: DateTime<Utc>,
    pub location: Coordinates,
}

/// Store-level filter for available listings.
#[derive(Debug, Clone, Copy)]
pub struct ListingFilter {
    /// Only listings inside this rectangle.
    pub bounds: Option<BoundingBox>,
    pub limit: i64,
    pub offset: i64,
}

/// Listing as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: ListingId,
    pub merchant_id: UserId,
    pub name: String,
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub discount_percent: u8,
    #[serde(rename = "expiry_date")]
    pub expires_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_listed: bool,
    pub status: ListingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ListingView {
    #[must_use]
    pub fn new(listing: Listing, distance_km: Option<f64>) -> Self {
        Self {
            id: listing.id,
            discount_percent: listing.pricing.discount_percent(),
            merchant_id: listing.merchant_id,
            name: listing.name,
            original_price: listing.pricing.original,
            current_price: listing.pricing.current,
            expires_at: listing.expires_at,
            latitude: listing.location.latitude,
            longitude: listing.location.longitude,
            is_listed: listing.is_listed,
            status: listing.status,
            distance_km,
        }
    }
}
