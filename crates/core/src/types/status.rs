//! Lifecycle statuses for listings and orders.
//!
//! Both are stored as plain text columns; the string forms below are the
//! persisted representation and must not change.

use serde::{Deserialize, Serialize};

/// Lifecycle of a listing.
///
/// The only transition is `Available -> Sold`, performed once by the purchase
/// coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
}

impl ListingStatus {
    /// Persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Sold => "SOLD",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "SOLD" => Ok(Self::Sold),
            _ => Err(format!("invalid listing status: {s}")),
        }
    }
}

/// Status of an order.
///
/// Orders are created `Pending` (awaiting pickup). Pickup tracking is not
/// modelled yet, so no other status is ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl OrderStatus {
    /// Persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_status_text_form() {
        assert_eq!(ListingStatus::Available.to_string(), "AVAILABLE");
        assert_eq!(ListingStatus::Sold.to_string(), "SOLD");
        assert_eq!(
            "SOLD".parse::<ListingStatus>().unwrap(),
            ListingStatus::Sold
        );
        assert!("sold".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn test_listing_status_json_matches_storage() {
        let json = serde_json::to_string(&ListingStatus::Available).unwrap();
        assert_eq!(json, "\"AVAILABLE\"");
    }

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(
            "pending".parse::<OrderStatus>().unwrap(),
            OrderStatus::Pending
        );
    }
}
