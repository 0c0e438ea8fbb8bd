//! Listing and purchase routes.

use axum::{Json, extract::State};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::Span;

use leftover_core::{ListingId, UserId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::ListingView;
use crate::services::listings::{BrowseQuery, ListingDraft, ListingService};
use crate::services::purchase::PurchaseCoordinator;
use crate::state::AppState;
use crate::store::Storage;

/// Request body for `POST /products`.
///
/// Prices accept JSON numbers or decimal strings.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub name: String,
    pub original_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub expiry_minutes: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Query string for `GET /products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

/// Request body for `POST /purchase/{id}`.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default)]
    pub consumer_id: String,
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

/// Publish a listing.
///
/// POST /products
///
/// # Errors
///
/// Returns 400 for invalid input or a non-merchant owner and 404 for an
/// unknown merchant.
pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<Json<Value>> {
    let draft = ListingDraft {
        merchant_id: req.merchant_id,
        name: req.name,
        original_price: required("original_price", req.original_price)?,
        current_price: required("current_price", req.current_price)?,
        expiry_minutes: required("expiry_minutes", req.expiry_minutes)?,
        latitude: required("latitude", req.latitude)?,
        longitude: required("longitude", req.longitude)?,
    };

    let listing = ListingService::new(state.store())
        .create(draft, Utc::now())
        .await?;

    Ok(Json(json!({
        "message": "Product listing created",
        "id": listing.id,
    })))
}

/// Available, unexpired listings, optionally near a point.
///
/// GET /products?limit=&offset=&lat=&lng=&radius_km=
///
/// # Errors
///
/// Returns 400 for inconsistent paging or location parameters.
pub async fn index<S: Storage>(
    State(state): State<AppState<S>>,
    ApiQuery(query): ApiQuery<ProductsQuery>,
) -> Result<Json<Vec<ListingView>>> {
    let browse = BrowseQuery {
        limit: query.limit,
        offset: query.offset,
        latitude: query.lat,
        longitude: query.lng,
        radius_km: query.radius_km,
    };

    let listings = ListingService::new(state.store())
        .browse(browse, Utc::now())
        .await?;

    Ok(Json(listings))
}

/// Buy a listing.
///
/// POST /purchase/{id}
///
/// # Errors
///
/// Returns 404 for an unknown listing or consumer, 400 when the listing is
/// sold or expired, and 503 when the listing stayed locked too long.
pub async fn purchase<S: Storage>(
    State(state): State<AppState<S>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<PurchaseRequest>,
) -> Result<Json<Value>> {
    let consumer_id = UserId::parse(&req.consumer_id)
        .ok_or_else(|| AppError::BadRequest("consumer_id is required".to_string()))?;
    let listing_id = ListingId::new(id);

    Span::current().record("user_id", consumer_id.as_str());
    let listing = listing_id.to_string();
    add_breadcrumb("purchase", "Purchase attempted", Some(&[("listing_id", listing.as_str())]));

    let order = PurchaseCoordinator::new(state.store(), state.purchase_settings())
        .purchase(listing_id, &consumer_id)
        .await?;

    Ok(Json(json!({
        "message": "Purchase successful! Enjoy your food.",
        "order_id": order.id,
    })))
}
