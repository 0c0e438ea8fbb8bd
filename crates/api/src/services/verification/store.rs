//! Storage for pending one-time codes.
//!
//! Pending codes are ephemeral: both implementations live in process memory and
//! lose everything on restart.

use std::collections::HashMap;
use std::future::{self, Future};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tokio::sync::RwLock;

use leftover_core::{OneTimeCode, PhoneNumber};

/// A code waiting to be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub code: OneTimeCode,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    /// A code is still valid at its exact expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Keyed storage for pending codes, one entry per phone.
pub trait CodeStore: Send + Sync + 'static {
    /// Store `pending`, replacing any earlier entry for the phone.
    fn put(&self, phone: PhoneNumber, pending: PendingCode) -> impl Future<Output = ()> + Send;

    fn get(&self, phone: &PhoneNumber) -> impl Future<Output = Option<PendingCode>> + Send;

    /// Atomically remove the entry if it still equals `expected`.
    ///
    /// The store's only delete. Returns whether this call removed it.
    fn remove_if(
        &self,
        phone: &PhoneNumber,
        expected: &PendingCode,
    ) -> impl Future<Output = bool> + Send;
}

/// `RwLock<HashMap>` store: lookups run concurrently, writes are exclusive.
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    entries: RwLock<HashMap<PhoneNumber, PendingCode>>,
}

impl MemoryCodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodeStore for MemoryCodeStore {
    async fn put(&self, phone: PhoneNumber, pending: PendingCode) {
        self.entries.write().await.insert(phone, pending);
    }

    async fn get(&self, phone: &PhoneNumber) -> Option<PendingCode> {
        self.entries.read().await.get(phone).cloned()
    }

    async fn remove_if(&self, phone: &PhoneNumber, expected: &PendingCode) -> bool {
        let mut entries = self.entries.write().await;
        if entries.get(phone) != Some(expected) {
            return false;
        }
        entries.remove(phone);
        true
    }
}

/// Bounded `moka` cache.
///
/// Entries are evicted a grace period after their code expires, so a late
/// verify still finds the entry and reports it as expired instead of missing.
#[derive(Clone)]
pub struct CachedCodeStore {
    cache: Cache<PhoneNumber, PendingCode>,
}

impl CachedCodeStore {
    /// How long an expired entry lingers before eviction.
    pub const EXPIRY_GRACE: Duration = Duration::from_secs(600);

    /// Pending codes held at most; the least recently used are evicted first.
    pub const DEFAULT_CAPACITY: u64 = 100_000;

    #[must_use]
    pub fn new(code_ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(code_ttl.saturating_add(Self::EXPIRY_GRACE))
                .build(),
        }
    }
}

impl CodeStore for CachedCodeStore {
    async fn put(&self, phone: PhoneNumber, pending: PendingCode) {
        self.cache.insert(phone, pending).await;
    }

    async fn get(&self, phone: &PhoneNumber) -> Option<PendingCode> {
        self.cache.get(phone).await
    }

    async fn remove_if(&self, phone: &PhoneNumber, expected: &PendingCode) -> bool {
        let result = self
            .cache
            .entry(phone.clone())
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) if entry.value() == expected => Op::Remove,
                    _ => Op::Nop,
                };
                future::ready(op)
            })
            .await;

        matches!(result, CompResult::Removed(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pending(code: &str) -> PendingCode {
        PendingCode {
            code: OneTimeCode::parse(code).unwrap(),
            expires_at: Utc::now(),
        }
    }

    async fn exercise(store: impl CodeStore) {
        let phone = PhoneNumber::parse("0912345678").unwrap();
        let first = pending("111111");
        let second = pending("222222");

        store.put(phone.clone(), first.clone()).await;
        store.put(phone.clone(), second.clone()).await;
        assert_eq!(store.get(&phone).await, Some(second.clone()));

        // A stale expectation must not remove the newer entry.
        assert!(!store.remove_if(&phone, &first).await);
        assert!(store.get(&phone).await.is_some());

        assert!(store.remove_if(&phone, &second).await);
        assert!(!store.remove_if(&phone, &second).await);
        assert_eq!(store.get(&phone).await, None);
    }

    #[tokio::test]
    async fn test_memory_code_store() {
        exercise(MemoryCodeStore::new()).await;
    }

    #[tokio::test]
    async fn test_cached_code_store() {
        exercise(CachedCodeStore::new(Duration::from_secs(300), 16)).await;
    }

    #[test]
    fn test_code_valid_at_expiry_instant() {
        let code = pending("123456");
        assert!(!code.is_expired_at(code.expires_at));
        assert!(code.is_expired_at(code.expires_at + chrono::Duration::milliseconds(1)));
    }
}
