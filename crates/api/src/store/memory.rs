//! In-process storage backend.
//!
//! Committed rows live in plain maps behind one `std::sync::Mutex`, held only for
//! the duration of a single read or write (never across an `.await`). The
//! purchase path adds a per-listing `tokio::sync::Mutex` that plays the part of
//! `SELECT ... FOR UPDATE`: a [`MemoryClaim`] holds it until commit or drop, and
//! stages its writes so nothing is visible before commit.
//!
//! Foreign keys and unique constraints of the SQL schema are checked by hand and
//! reported with the same [`RepositoryError`] variants as the Postgres backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use leftover_core::{
    FavoriteId, ListingId, ListingStatus, NotificationId, OrderId, OrderStatus, ReviewId, UserId,
};

use super::{
    ClaimTransaction, FavoriteStore, ListingStore, MerchantStore, NotificationStore,
    PurchaseLedger, RepositoryError, ReviewStore, Storage, UserStore,
};
use crate::models::{
    FavoriteMerchant, Listing, ListingFilter, LockedListing, MerchantProfile, MerchantSearch,
    MerchantStats, MerchantSummary, NewListing, NewNotification, NewOrder, NewReview, NewUser,
    Notification, Order, RatingSummary, Review, User,
};

/// Wait applied when `mark_sold` has to take the row lock itself, like the
/// implicit lock of an SQL `UPDATE`.
const IMPLICIT_LOCK_WAIT: Duration = Duration::from_secs(5);

type RowLock = Arc<tokio::sync::Mutex<()>>;

/// In-memory implementation of every storage trait.
///
/// Cheap to clone; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<ListingId, RowLock>>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    merchants: BTreeMap<UserId, MerchantProfile>,
    listings: BTreeMap<ListingId, Listing>,
    orders: BTreeMap<OrderId, Order>,
    reviews: Vec<Review>,
    favorites: Vec<FavoriteRow>,
    notifications: Vec<Notification>,
    sequences: Sequences,
}

#[derive(Default)]
struct Sequences {
    listing: i32,
    order: i32,
    review: i32,
    favorite: i32,
    notification: i32,
}

fn next_value(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

struct FavoriteRow {
    id: FavoriteId,
    user_id: UserId,
    merchant_id: UserId,
    created_at: DateTime<Utc>,
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn missing(what: &str) -> RepositoryError {
    RepositoryError::MissingReference(format!("{what} does not exist"))
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, id: ListingId) -> RowLock {
        let mut locks = self
            .inner
            .row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    fn listing_exists(&self, id: ListingId) -> bool {
        self.tables().listings.contains_key(&id)
    }

    fn locked_view(&self, id: ListingId) -> Option<LockedListing> {
        self.tables().listings.get(&id).map(|l| LockedListing {
            id: l.id,
            merchant_id: l.merchant_id.clone(),
            name: l.name.clone(),
            status: l.status,
            expires_at: l.expires_at,
        })
    }

    /// Validate references and reserve an order id (consumed even on rollback,
    /// like a sequence).
    fn prepare_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables();
        if !tables.users.contains_key(&order.consumer_id) {
            return Err(missing("consumer"));
        }
        if !tables.listings.contains_key(&order.listing_id) {
            return Err(missing("listing"));
        }
        if tables
            .orders
            .values()
            .any(|o| o.listing_id == order.listing_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "listing {} already has an order",
                order.listing_id
            )));
        }

        Ok(Order {
            id: OrderId::new(next_value(&mut tables.sequences.order)),
            listing_id: order.listing_id,
            consumer_id: order.consumer_id.clone(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }

    fn apply_claim(&self, sold: &[ListingId], orders: Vec<Order>) {
        let mut tables = self.tables();
        for id in sold {
            if let Some(listing) = tables.listings.get_mut(id) {
                listing.status = ListingStatus::Sold;
            }
        }
        for order in orders {
            tables.orders.insert(order.id, order);
        }
    }

    /// Committed order for a listing, if any.
    #[must_use]
    pub fn order_for_listing(&self, id: ListingId) -> Option<Order> {
        self.tables()
            .orders
            .values()
            .find(|o| o.listing_id == id)
            .cloned()
    }

    /// Number of committed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables().orders.len()
    }

    /// Current committed state of a listing, whatever its status.
    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<Listing> {
        self.tables().listings.get(&id).cloned()
    }
}

// =============================================================================
// Users & Merchants
// =============================================================================

impl UserStore for MemoryStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables().users.get(id).cloned())
    }

    async fn find_by_credential(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.auth_provider == provider && u.auth_id == subject)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let user = user.into_user(Utc::now());
        let mut tables = self.tables();

        if tables.users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user {} exists", user.id)));
        }
        if tables
            .users
            .values()
            .any(|u| u.auth_provider == user.auth_provider && u.auth_id == user.auth_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "credential {}:{} is taken",
                user.auth_provider, user.auth_id
            )));
        }

        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

impl MerchantStore for MemoryStore {
    async fn upsert_profile(&self, mut profile: MerchantProfile) -> Result<MerchantProfile, RepositoryError> {
        let mut tables = self.tables();
        let user = tables
            .users
            .get_mut(&profile.user_id)
            .ok_or(RepositoryError::NotFound)?;
        user.is_merchant = true;

        if let Some(existing) = tables.merchants.get(&profile.user_id) {
            profile.created_at = existing.created_at;
        }
        tables
            .merchants
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, merchant_id: &UserId) -> Result<Option<MerchantProfile>, RepositoryError> {
        Ok(self.tables().merchants.get(merchant_id).cloned())
    }

    async fn search_merchants(
        &self,
        search: MerchantSearch,
    ) -> Result<Vec<MerchantSummary>, RepositoryError> {
        let needle = search.query.as_deref().map(str::to_lowercase);
        let limit = usize::try_from(search.limit).unwrap_or(0);
        let tables = self.tables();

        let mut found: Vec<MerchantSummary> = tables
            .merchants
            .values()
            .filter(|m| {
                needle.as_deref().is_none_or(|n| {
                    m.shop_name.to_lowercase().contains(n) || m.address.to_lowercase().contains(n)
                })
            })
            .filter(|m| {
                search
                    .category
                    .as_deref()
                    .is_none_or(|c| m.category.as_deref() == Some(c))
            })
            .map(MerchantSummary::from)
            .collect();

        found.sort_by(|a, b| {
            a.shop_name
                .cmp(&b.shop_name)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        found.truncate(limit);
        Ok(found)
    }

    async fn merchant_stats(&self, merchant_id: &UserId) -> Result<MerchantStats, RepositoryError> {
        let tables = self.tables();
        let summary = summarize(&tables.reviews, merchant_id);
        let product_count = tables
            .listings
            .values()
            .filter(|l| &l.merchant_id == merchant_id && l.status == ListingStatus::Available)
            .count();

        Ok(MerchantStats {
            average_rating: summary.average,
            total_reviews: summary.count,
            product_count: count(product_count),
        })
    }
}

// =============================================================================
// Listings & Purchases
// =============================================================================

impl ListingStore for MemoryStore {
    async fn create_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        let mut tables = self.tables();
        if !tables.users.contains_key(&listing.merchant_id) {
            return Err(missing("merchant"));
        }

        let listing = Listing {
            id: ListingId::new(next_value(&mut tables.sequences.listing)),
            merchant_id: listing.merchant_id,
            name: listing.name,
            pricing: listing.pricing,
            expires_at: listing.expires_at,
            location: listing.location,
            is_listed: true,
            status: ListingStatus::Available,
            created_at: Utc::now(),
        };
        tables.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn list_available(
        &self,
        now: DateTime<Utc>,
        filter: ListingFilter,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        let tables = self.tables();

        let mut available: Vec<&Listing> = tables
            .listings
            .values()
            .filter(|l| l.is_listed && l.is_available_at(now))
            .filter(|l| filter.bounds.is_none_or(|b| b.contains(&l.location)))
            .collect();
        available.sort_by_key(|l| (l.expires_at, l.id));

        Ok(available
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Claim transaction over [`MemoryStore`].
pub struct MemoryClaim {
    store: MemoryStore,
    held: Vec<(ListingId, OwnedMutexGuard<()>)>,
    sold: Vec<ListingId>,
    orders: Vec<Order>,
}

impl MemoryClaim {
    fn holds(&self, id: ListingId) -> bool {
        self.held.iter().any(|(held, _)| *held == id)
    }

    async fn acquire(&mut self, id: ListingId, wait: Duration) -> Result<(), RepositoryError> {
        if self.holds(id) {
            return Ok(());
        }
        let lock = self.store.row_lock(id);
        let guard = tokio::time::timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| RepositoryError::LockTimeout)?;
        self.held.push((id, guard));
        Ok(())
    }
}

impl PurchaseLedger for MemoryStore {
    type Tx = MemoryClaim;

    async fn begin(&self) -> Result<MemoryClaim, RepositoryError> {
        Ok(MemoryClaim {
            store: self.clone(),
            held: Vec::new(),
            sold: Vec::new(),
            orders: Vec::new(),
        })
    }
}

impl ClaimTransaction for MemoryClaim {
    async fn lock_listing(
        &mut self,
        id: ListingId,
        wait: Duration,
    ) -> Result<Option<LockedListing>, RepositoryError> {
        // Listings are never deleted, so a missing row stays missing.
        if !self.store.listing_exists(id) {
            return Ok(None);
        }
        self.acquire(id, wait).await?;

        let sold_here = self.sold.contains(&id);
        Ok(self.store.locked_view(id).map(|mut view| {
            if sold_here {
                view.status = ListingStatus::Sold;
            }
            view
        }))
    }

    async fn mark_sold(&mut self, id: ListingId) -> Result<(), RepositoryError> {
        if !self.store.listing_exists(id) {
            return Err(RepositoryError::NotFound);
        }
        self.acquire(id, IMPLICIT_LOCK_WAIT).await?;
        if !self.sold.contains(&id) {
            self.sold.push(id);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        if self.orders.iter().any(|o| o.listing_id == order.listing_id) {
            return Err(RepositoryError::Conflict(format!(
                "listing {} already has an order",
                order.listing_id
            )));
        }
        let order = self.store.prepare_order(&order)?;
        self.orders.push(order.clone());
        Ok(order)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        // Row locks are released when `self` drops, after the writes land.
        self.store.apply_claim(&self.sold, self.orders);
        Ok(())
    }
}

// =============================================================================
// Social
// =============================================================================

#[allow(clippy::cast_precision_loss)] // review counts never approach 2^52
fn summarize(reviews: &[Review], merchant_id: &UserId) -> RatingSummary {
    let ratings: Vec<f64> = reviews
        .iter()
        .filter(|r| &r.merchant_id == merchant_id)
        .map(|r| f64::from(r.rating.get()))
        .collect();

    if ratings.is_empty() {
        return RatingSummary::default();
    }
    RatingSummary {
        average: ratings.iter().sum::<f64>() / ratings.len() as f64,
        count: count(ratings.len()),
    }
}

impl ReviewStore for MemoryStore {
    async fn create_review(&self, review: NewReview) -> Result<ReviewId, RepositoryError> {
        let mut tables = self.tables();
        if !tables.orders.contains_key(&review.order_id) {
            return Err(missing("order"));
        }
        if !tables.users.contains_key(&review.user_id) {
            return Err(missing("user"));
        }
        if !tables.merchants.contains_key(&review.merchant_id) {
            return Err(missing("merchant"));
        }

        let id = ReviewId::new(next_value(&mut tables.sequences.review));
        tables.reviews.push(Review {
            id,
            order_id: review.order_id,
            user_id: review.user_id,
            merchant_id: review.merchant_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn reviews_for_merchant(&self, merchant_id: &UserId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables();
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| &r.merchant_id == merchant_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn rating_summary(&self, merchant_id: &UserId) -> Result<RatingSummary, RepositoryError> {
        Ok(summarize(&self.tables().reviews, merchant_id))
    }
}

impl FavoriteStore for MemoryStore {
    async fn toggle_favorite(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|f| !(&f.user_id == user_id && &f.merchant_id == merchant_id));
        if tables.favorites.len() < before {
            return Ok(false);
        }

        if !tables.users.contains_key(user_id) {
            return Err(missing("user"));
        }
        if !tables.merchants.contains_key(merchant_id) {
            return Err(missing("merchant"));
        }
        let id = FavoriteId::new(next_value(&mut tables.sequences.favorite));
        tables.favorites.push(FavoriteRow {
            id,
            user_id: user_id.clone(),
            merchant_id: merchant_id.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn favorites_for_user(&self, user_id: &UserId) -> Result<Vec<FavoriteMerchant>, RepositoryError> {
        let tables = self.tables();
        let mut rows: Vec<&FavoriteRow> = tables
            .favorites
            .iter()
            .filter(|f| &f.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .filter_map(|f| {
                tables.merchants.get(&f.merchant_id).map(|m| FavoriteMerchant {
                    id: f.id,
                    merchant_id: m.user_id.clone(),
                    shop_name: m.shop_name.clone(),
                    address: m.address.clone(),
                    category: m.category.clone(),
                })
            })
            .collect())
    }

    async fn is_favorite(&self, user_id: &UserId, merchant_id: &UserId) -> Result<bool, RepositoryError> {
        Ok(self
            .tables()
            .favorites
            .iter()
            .any(|f| &f.user_id == user_id && &f.merchant_id == merchant_id))
    }
}

impl NotificationStore for MemoryStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, RepositoryError> {
        let mut tables = self.tables();
        if !tables.users.contains_key(&notification.user_id) {
            return Err(missing("user"));
        }

        let id = NotificationId::new(next_value(&mut tables.sequences.notification));
        tables.notifications.push(Notification {
            id,
            user_id: notification.user_id,
            title: notification.title,
            body: notification.body,
            kind: notification.kind,
            is_read: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let tables = self.tables();
        let mut mine: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        mine.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(mine)
    }

    async fn unread_count(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        let unread = self
            .tables()
            .notifications
            .iter()
            .filter(|n| &n.user_id == user_id && !n.is_read)
            .count();
        Ok(count(unread))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        match tables.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Storage for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use leftover_core::{Coordinates, Credential, Pricing};
    use rust_decimal::Decimal;

    use super::*;

    async fn user(store: &MemoryStore, subject: &str) -> User {
        store
            .insert_user(NewUser {
                id: UserId::generate(),
                credential: Credential::external("google", subject).unwrap(),
                email: None,
                wallet_address: None,
            })
            .await
            .unwrap()
    }

    async fn listing(store: &MemoryStore, merchant: &User) -> Listing {
        store
            .create_listing(NewListing {
                merchant_id: merchant.id.clone(),
                name: "Bento".to_owned(),
                pricing: Pricing::new(Decimal::from(120), Decimal::from(60)).unwrap(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
                location: Coordinates::new(25.03, 121.56).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_credential_conflicts() {
        let store = MemoryStore::new();
        user(&store, "abc").await;

        let err = store
            .insert_user(NewUser {
                id: UserId::generate(),
                credential: Credential::external("google", "abc").unwrap(),
                email: None,
                wallet_address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_claim_writes_invisible_until_commit() {
        let store = MemoryStore::new();
        let merchant = user(&store, "m").await;
        let consumer = user(&store, "c").await;
        let item = listing(&store, &merchant).await;

        let mut tx = store.begin().await.unwrap();
        tx.lock_listing(item.id, Duration::from_secs(1)).await.unwrap();
        tx.mark_sold(item.id).await.unwrap();
        tx.insert_order(NewOrder {
            listing_id: item.id,
            consumer_id: consumer.id.clone(),
        })
        .await
        .unwrap();

        assert_eq!(store.listing(item.id).unwrap().status, ListingStatus::Available);
        assert_eq!(store.order_count(), 0);

        tx.commit().await.unwrap();
        assert_eq!(store.listing(item.id).unwrap().status, ListingStatus::Sold);
        assert_eq!(store.order_for_listing(item.id).unwrap().consumer_id, consumer.id);
    }

    #[tokio::test]
    async fn test_dropped_claim_rolls_back_and_releases_lock() {
        let store = MemoryStore::new();
        let merchant = user(&store, "m").await;
        let item = listing(&store, &merchant).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_listing(item.id, Duration::from_secs(1)).await.unwrap();
            tx.mark_sold(item.id).await.unwrap();
        }

        assert_eq!(store.listing(item.id).unwrap().status, ListingStatus::Available);
        let mut tx = store.begin().await.unwrap();
        let locked = tx
            .lock_listing(item.id, Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked.status, ListingStatus::Available);
    }

    #[tokio::test]
    async fn test_second_locker_times_out() {
        let store = MemoryStore::new();
        let merchant = user(&store, "m").await;
        let item = listing(&store, &merchant).await;

        let mut first = store.begin().await.unwrap();
        first.lock_listing(item.id, Duration::from_secs(1)).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = second
            .lock_listing(item.id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::LockTimeout));
    }

    #[tokio::test]
    async fn test_order_requires_existing_consumer() {
        let store = MemoryStore::new();
        let merchant = user(&store, "m").await;
        let item = listing(&store, &merchant).await;

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_order(NewOrder {
                listing_id: item.id,
                consumer_id: UserId::parse("usr_ghost").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_list_available_hides_expired_and_paginates() {
        let store = MemoryStore::new();
        let merchant = user(&store, "m").await;
        let a = listing(&store, &merchant).await;
        let b = listing(&store, &merchant).await;
        let now = Utc::now();

        let all = store
            .list_available(
                now,
                ListingFilter {
                    bounds: None,
                    limit: 10,
                    offset: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(all.iter().map(|l| l.id).collect::<Vec<_>>(), vec![a.id, b.id]);

        let later = store
            .list_available(
                now + chrono::Duration::hours(2),
                ListingFilter {
                    bounds: None,
                    limit: 10,
                    offset: 0,
                },
            )
            .await
            .unwrap();
        assert!(later.is_empty());

        let second_page = store
            .list_available(
                now,
                ListingFilter {
                    bounds: None,
                    limit: 1,
                    offset: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page.first().unwrap().id, b.id);
    }
}
