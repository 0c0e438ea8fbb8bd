//! Demo data.
//!
//! Creates a demo merchant (an external `demo` identity with a shop profile in
//! Taipei) and three discounted listings. Listings the merchant still has on
//! sale under the same name are not duplicated.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use leftover_api::config::get_database_url;
use leftover_api::db::{self, PgStore};
use leftover_api::models::ListingFilter;
use leftover_api::services::identity::{IdentityResolver, LoginAttributes};
use leftover_api::services::listings::{ListingDraft, ListingService};
use leftover_api::services::merchants::{MerchantDirectory, ProfileDraft};
use leftover_api::store::ListingStore;
use leftover_core::Credential;

use super::migrate::DATABASE_URL_VAR;

const DEMO_PROVIDER: &str = "demo";
const DEMO_SUBJECT: &str = "demo-merchant";

/// Upper bound on listings scanned for duplicates.
const SCAN_LIMIT: i64 = 1000;

struct DemoItem {
    name: &'static str,
    original: i64,
    current: i64,
    hours: i64,
    latitude: f64,
    longitude: f64,
}

const DEMO_ITEMS: [DemoItem; 3] = [
    DemoItem {
        name: "Sushi Box",
        original: 200,
        current: 100,
        hours: 2,
        latitude: 25.0335,
        longitude: 121.5650,
    },
    DemoItem {
        name: "Bread",
        original: 50,
        current: 25,
        hours: 5,
        latitude: 25.0340,
        longitude: 121.5660,
    },
    DemoItem {
        name: "Milk",
        original: 90,
        current: 45,
        hours: 10,
        latitude: 25.0320,
        longitude: 121.5640,
    },
];

/// Seed the demo merchant and listings.
///
/// # Errors
///
/// Returns an error if the database is unreachable or any write fails.
pub async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = get_database_url(DATABASE_URL_VAR)?;
    let store = PgStore::new(db::create_pool(&database_url).await?);

    let merchant = IdentityResolver::new(&store)
        .resolve(
            Credential::external(DEMO_PROVIDER, DEMO_SUBJECT)?,
            LoginAttributes::default(),
        )
        .await?;
    info!(user_id = %merchant.id, "Demo merchant ready");

    MerchantDirectory::new(&store)
        .setup(ProfileDraft {
            user_id: merchant.id.to_string(),
            shop_name: "Leftover Demo Kitchen".to_string(),
            address: "No. 7, Section 5, Xinyi Road, Taipei".to_string(),
            latitude: Some(25.0335),
            longitude: Some(121.5650),
            category: Some("restaurant".to_string()),
            description: Some("Demo shop created by leftover-cli seed".to_string()),
            ..ProfileDraft::default()
        })
        .await?;

    let now = Utc::now();
    let on_sale: HashSet<String> = store
        .list_available(
            now,
            ListingFilter {
                bounds: None,
                limit: SCAN_LIMIT,
                offset: 0,
            },
        )
        .await?
        .into_iter()
        .filter(|listing| listing.merchant_id == merchant.id)
        .map(|listing| listing.name)
        .collect();

    let listings = ListingService::new(&store);
    let mut created = 0_usize;
    for item in &DEMO_ITEMS {
        if on_sale.contains(item.name) {
            info!(name = item.name, "Listing already on sale, skipping");
            continue;
        }

        let listing = listings
            .create(
                ListingDraft {
                    merchant_id: merchant.id.to_string(),
                    name: item.name.to_string(),
                    original_price: Decimal::from(item.original),
                    current_price: Decimal::from(item.current),
                    expiry_minutes: item.hours * 60,
                    latitude: item.latitude,
                    longitude: item.longitude,
                },
                now,
            )
            .await?;
        info!(listing_id = %listing.id, name = item.name, "Listing created");
        created += 1;
    }

    info!("Seeding complete!");
    info!("  Listings created: {created}");
    info!("  Listings skipped: {}", DEMO_ITEMS.len() - created);
    Ok(())
}
