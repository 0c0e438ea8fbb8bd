//! Merchant profiles and search.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use leftover_core::{Coordinates, GeoError, UserId};

use crate::models::{MerchantProfile, MerchantSearch, MerchantStats, MerchantSummary};
use crate::store::{MerchantStore, RepositoryError};

/// Most results returned by a merchant search.
pub const SEARCH_LIMIT: i64 = 20;

/// Longest accepted free-text field, in characters.
const MAX_TEXT_LENGTH: usize = 500;

#[derive(Debug, Error)]
pub enum MerchantError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} must be at most {max} characters", max = MAX_TEXT_LENGTH)]
    TooLong(&'static str),

    #[error("latitude and longitude must be given together")]
    PartialLocation,

    #[error(transparent)]
    Location(#[from] GeoError),

    #[error("User not found")]
    UserNotFound,

    #[error("Merchant not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Profile fields as submitted by the shop owner.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub user_id: String,
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
}

/// A profile with its aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantDetails {
    pub profile: MerchantProfile,
    pub stats: MerchantStats,
}

pub struct MerchantDirectory<'a, S> {
    store: &'a S,
}

impl<'a, S: MerchantStore> MerchantDirectory<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create or replace the caller's shop profile, turning them into a merchant.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input and `UserNotFound` if the
    /// user does not exist.
    pub async fn setup(&self, draft: ProfileDraft) -> Result<MerchantProfile, MerchantError> {
        let profile = validate_profile(draft)?;

        let profile = self
            .store
            .upsert_profile(profile)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound | RepositoryError::MissingReference(_) => {
                    MerchantError::UserNotFound
                }
                other => other.into(),
            })?;

        info!(merchant_id = %profile.user_id, shop_name = %profile.shop_name, "Merchant profile saved");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `MerchantError::NotFound` if the merchant has no profile.
    pub async fn details(&self, merchant_id: &UserId) -> Result<MerchantDetails, MerchantError> {
        let profile = self
            .store
            .get_profile(merchant_id)
            .await?
            .ok_or(MerchantError::NotFound)?;
        let stats = self.store.merchant_stats(merchant_id).await?;

        Ok(MerchantDetails { profile, stats })
    }

    /// Case-insensitive substring search on shop name or address, optionally
    /// restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `MerchantError::Repository` if the query fails.
    pub async fn search(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<MerchantSummary>, MerchantError> {
        let search = MerchantSearch {
            query: non_blank(query.map(str::to_owned)),
            category: non_blank(category.map(str::to_owned)),
            limit: SEARCH_LIMIT,
        };
        Ok(self.store.search_merchants(search).await?)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn bounded(field: &'static str, value: Option<String>) -> Result<Option<String>, MerchantError> {
    let value = non_blank(value);
    if value
        .as_deref()
        .is_some_and(|v| v.chars().count() > MAX_TEXT_LENGTH)
    {
        return Err(MerchantError::TooLong(field));
    }
    Ok(value)
}

fn validate_profile(draft: ProfileDraft) -> Result<MerchantProfile, MerchantError> {
    let user_id = UserId::parse(&draft.user_id).ok_or(MerchantError::MissingField("user_id"))?;
    let shop_name =
        bounded("shop_name", Some(draft.shop_name))?.ok_or(MerchantError::MissingField("shop_name"))?;
    let address =
        bounded("address", Some(draft.address))?.ok_or(MerchantError::MissingField("address"))?;

    let (latitude, longitude) = match (draft.latitude, draft.longitude) {
        (Some(lat), Some(lng)) => {
            let point = Coordinates::new(lat, lng)?;
            (Some(point.latitude), Some(point.longitude))
        }
        (None, None) => (None, None),
        _ => return Err(MerchantError::PartialLocation),
    };

    Ok(MerchantProfile {
        user_id,
        shop_name,
        address,
        latitude,
        longitude,
        phone: bounded("phone", draft.phone)?,
        email: bounded("email", draft.email)?,
        business_hours_open: bounded("business_hours_open", draft.business_hours_open)?,
        business_hours_close: bounded("business_hours_close", draft.business_hours_close)?,
        category: bounded("category", draft.category)?,
        description: bounded("description", draft.description)?,
        created_at: Utc::now(),
    })
}
