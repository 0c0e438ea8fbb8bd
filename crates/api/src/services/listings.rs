//! Listing creation and browsing.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use leftover_core::{BoundingBox, Coordinates, GeoError, Pricing, PricingError, UserId};

use crate::models::{Listing, ListingFilter, ListingView, NewListing};
use crate::store::{ListingStore, RepositoryError, UserStore};

/// Longest accepted listing name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const MAX_RADIUS_KM: f64 = 50.0;

/// Bounding-box candidates fetched for a nearby search before exact filtering.
const NEARBY_CANDIDATE_LIMIT: i64 = 1000;

/// Errors from listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("name must be at most {} characters", MAX_NAME_LENGTH)]
    NameTooLong,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Location(#[from] GeoError),

    #[error("expiry_minutes must not be negative")]
    NegativeExpiry,

    #[error("expiry_minutes is too large")]
    ExpiryOutOfRange,

    #[error("{0}")]
    InvalidQuery(&'static str),

    #[error("Merchant not found")]
    MerchantNotFound,

    #[error("User is not a merchant")]
    NotMerchant,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A listing as submitted by a merchant.
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub merchant_id: String,
    pub name: String,
    pub original_price: Decimal,
    pub current_price: Decimal,
    /// Minutes from now until the food must be sold. Zero is allowed and yields
    /// a listing that is already expired.
    pub expiry_minutes: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Browse parameters for available listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowseQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
}

/// Listing creation and browsing over a store.
pub struct ListingService<'a, S> {
    store: &'a S,
}

impl<'a, S: ListingStore + UserStore> ListingService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate a draft and publish it as an `AVAILABLE` listing.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of `ListingError` for bad input (no storage
    /// access), `MerchantNotFound` for an unknown merchant and `NotMerchant`
    /// when the user has no merchant profile.
    pub async fn create(&self, draft: ListingDraft, now: DateTime<Utc>) -> Result<Listing, ListingError> {
        let new_listing = validate_draft(draft, now)?;

        let merchant = self
            .store
            .find_user(&new_listing.merchant_id)
            .await?
            .ok_or(ListingError::MerchantNotFound)?;
        if !merchant.is_merchant {
            return Err(ListingError::NotMerchant);
        }

        let listing = self.store.create_listing(new_listing).await?;
        info!(
            listing_id = %listing.id,
            merchant_id = %listing.merchant_id,
            expires_at = %listing.expires_at,
            "Listing created"
        );
        Ok(listing)
    }

    /// Available listings at `now`.
    ///
    /// Without a location the result is ordered by soonest expiry. With one,
    /// listings outside the radius are dropped, the distance is attached and
    /// the nearest come first.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::InvalidQuery` or `Location` for bad parameters.
    pub async fn browse(&self, query: BrowseQuery, now: DateTime<Utc>) -> Result<Vec<ListingView>, ListingError> {
        let limit = match query.limit {
            None => DEFAULT_PAGE_SIZE,
            Some(n) if n < 1 => return Err(ListingError::InvalidQuery("limit must be positive")),
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        let offset = match query.offset {
            None => 0,
            Some(n) if n < 0 => return Err(ListingError::InvalidQuery("offset must not be negative")),
            Some(n) => n,
        };

        let center = match (query.latitude, query.longitude) {
            (None, None) => None,
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)?),
            _ => return Err(ListingError::InvalidQuery("lat and lng must be given together")),
        };

        let Some(center) = center else {
            if query.radius_km.is_some() {
                return Err(ListingError::InvalidQuery("radius_km requires lat and lng"));
            }
            let listings = self
                .store
                .list_available(
                    now,
                    ListingFilter {
                        bounds: None,
                        limit,
                        offset,
                    },
                )
                .await?;
            return Ok(listings
                .into_iter()
                .map(|l| ListingView::new(l, None))
                .collect());
        };

        let radius = match query.radius_km {
            None => DEFAULT_RADIUS_KM,
            Some(r) if !r.is_finite() || r <= 0.0 => {
                return Err(ListingError::InvalidQuery("radius_km must be positive"));
            }
            Some(r) => r.min(MAX_RADIUS_KM),
        };

        let candidates = self
            .store
            .list_available(
                now,
                ListingFilter {
                    bounds: Some(BoundingBox::around(center, radius)),
                    limit: NEARBY_CANDIDATE_LIMIT,
                    offset: 0,
                },
            )
            .await?;

        let mut nearby: Vec<(f64, Listing)> = candidates
            .into_iter()
            .filter_map(|l| {
                let distance = center.distance_km(&l.location);
                (distance <= radius).then_some((distance, l))
            })
            .collect();
        nearby.sort_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)));

        Ok(nearby
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(distance, l)| ListingView::new(l, Some(distance)))
            .collect())
    }
}

fn validate_draft(draft: ListingDraft, now: DateTime<Utc>) -> Result<NewListing, ListingError> {
    let merchant_id =
        UserId::parse(&draft.merchant_id).ok_or(ListingError::MissingField("merchant_id"))?;

    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ListingError::MissingField("name"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ListingError::NameTooLong);
    }

    let pricing = Pricing::new(draft.original_price, draft.current_price)?;
    let location = Coordinates::new(draft.latitude, draft.longitude)?;

    if draft.expiry_minutes < 0 {
        return Err(ListingError::NegativeExpiry);
    }
    let expires_at = TimeDelta::try_minutes(draft.expiry_minutes)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or(ListingError::ExpiryOutOfRange)?;

    Ok(NewListing {
        merchant_id,
        name: name.to_owned(),
        pricing,
        expires_at,
        location,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use leftover_core::{Credential, ListingStatus};

    use super::*;
    use crate::models::{MerchantProfile, NewUser, User};
    use crate::store::MerchantStore;
    use crate::store::memory::MemoryStore;

    async fn merchant(store: &MemoryStore) -> User {
        let user = store
            .insert_user(NewUser {
                id: UserId::generate(),
                credential: Credential::external("google", "shop").unwrap(),
                email: None,
                wallet_address: None,
            })
            .await
            .unwrap();
        store
            .upsert_profile(MerchantProfile {
                user_id: user.id.clone(),
                shop_name: "Corner Bakery".to_owned(),
                address: "1 Main St".to_owned(),
                latitude: None,
                longitude: None,
                phone: None,
                email: None,
                business_hours_open: None,
                business_hours_close: None,
                category: None,
                description: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        user
    }

    fn draft(merchant_id: &UserId, lat: f64, lng: f64) -> ListingDraft {
        ListingDraft {
            merchant_id: merchant_id.to_string(),
            name: "Sushi Box".to_owned(),
            original_price: Decimal::from(200),
            current_price: Decimal::from(100),
            expiry_minutes: 120,
            latitude: lat,
            longitude: lng,
        }
    }

    #[tokio::test]
    async fn test_create_sets_expiry_and_status() {
        let store = MemoryStore::new();
        let merchant = merchant(&store).await;
        let now = Utc::now();

        let listing = ListingService::new(&store)
            .create(draft(&merchant.id, 25.0335, 121.5650), now)
            .await
            .unwrap();

        assert_eq!(listing.status, ListingStatus::Available);
        assert!(listing.is_listed);
        assert_eq!(listing.expires_at, now + TimeDelta::minutes(120));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let store = MemoryStore::new();
        let merchant = merchant(&store).await;
        let service = ListingService::new(&store);
        let now = Utc::now();

        let mut bad = draft(&merchant.id, 25.0, 121.0);
        bad.current_price = Decimal::from(300);
        assert!(matches!(service.create(bad, now).await, Err(ListingError::Pricing(_))));

        let bad = draft(&merchant.id, 91.0, 121.0);
        assert!(matches!(service.create(bad, now).await, Err(ListingError::Location(_))));

        let mut bad = draft(&merchant.id, 25.0, 121.0);
        bad.expiry_minutes = -1;
        assert!(matches!(service.create(bad, now).await, Err(ListingError::NegativeExpiry)));

        let mut bad = draft(&merchant.id, 25.0, 121.0);
        bad.name = " ".into();
        assert!(matches!(
            service.create(bad, now).await,
            Err(ListingError::MissingField("name"))
        ));
    }

    #[tokio::test]
    async fn test_create_requires_merchant() {
        let store = MemoryStore::new();
        let consumer = store
            .insert_user(NewUser {
                id: UserId::generate(),
                credential: Credential::external("google", "eater").unwrap(),
                email: None,
                wallet_address: None,
            })
            .await
            .unwrap();
        let service = ListingService::new(&store);

        let result = service.create(draft(&consumer.id, 25.0, 121.0), Utc::now()).await;
        assert!(matches!(result, Err(ListingError::NotMerchant)));

        let ghost = UserId::parse("usr_ghost").unwrap();
        let result = service.create(draft(&ghost, 25.0, 121.0), Utc::now()).await;
        assert!(matches!(result, Err(ListingError::MerchantNotFound)));
    }

    #[tokio::test]
    async fn test_browse_nearby_orders_by_distance() {
        let store = MemoryStore::new();
        let merchant = merchant(&store).await;
        let service = ListingService::new(&store);
        let now = Utc::now();

        // ~1.1 km, ~0.1 km and ~30 km north of the search center.
        let far = service.create(draft(&merchant.id, 25.043, 121.565), now).await.unwrap();
        let near = service.create(draft(&merchant.id, 25.033, 121.565), now).await.unwrap();
        service.create(draft(&merchant.id, 25.302, 121.565), now).await.unwrap();

        let found = service
            .browse(
                BrowseQuery {
                    latitude: Some(25.032),
                    longitude: Some(121.565),
                    ..BrowseQuery::default()
                },
                now,
            )
            .await
            .unwrap();

        let ids: Vec<_> = found.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
        assert!(found.first().unwrap().distance_km < found.get(1).unwrap().distance_km);
    }

    #[tokio::test]
    async fn test_browse_validates_query() {
        let store = MemoryStore::new();
        let service = ListingService::new(&store);
        let now = Utc::now();

        let half_location = BrowseQuery {
            latitude: Some(25.0),
            ..BrowseQuery::default()
        };
        assert!(matches!(
            service.browse(half_location, now).await,
            Err(ListingError::InvalidQuery(_))
        ));

        let zero_limit = BrowseQuery {
            limit: Some(0),
            ..BrowseQuery::default()
        };
        assert!(matches!(
            service.browse(zero_limit, now).await,
            Err(ListingError::InvalidQuery(_))
        ));
    }
}
