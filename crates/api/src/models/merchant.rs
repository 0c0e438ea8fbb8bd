//! Merchant profile types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use leftover_core::UserId;

/// Shop profile attached 1:1 to a merchant user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantProfile {
    pub user_id: UserId,
    pub shop_name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub business_hours_open: Option<String>,
    pub business_hours_close: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Search criteria for merchants.
#[derive(Debug, Clone, Default)]
pub struct MerchantSearch {
    /// Case-insensitive substring of shop name or address.
    pub query: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    pub limit: i64,
}

/// Search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantSummary {
    pub user_id: UserId,
    pub shop_name: String,
    pub address: String,
    pub category: Option<String>,
}

impl From<&MerchantProfile> for MerchantSummary {
    fn from(profile: &MerchantProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            shop_name: profile.shop_name.clone(),
            address: profile.address.clone(),
            category: profile.category.clone(),
        }
    }
}

/// Aggregates shown on a merchant's page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MerchantStats {
    /// Mean review rating, 0 when there are no reviews.
    pub average_rating: f64,
    pub total_reviews: i64,
    /// Listings currently in `AVAILABLE` status.
    pub product_count: i64,
}
