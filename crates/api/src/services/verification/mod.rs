//! Phone verification with one-time codes.
//!
//! Per phone number the verifier walks `none -> pending -> (consumed | expired)
//! -> none`. Issuing replaces any pending code; a successful verify consumes it.
//! Failed attempts are not counted.

mod delivery;
mod store;

pub use delivery::{CodeDelivery, DeliveryError, DeliveryFuture, LogDelivery};
pub use store::{CachedCodeStore, CodeStore, MemoryCodeStore, PendingCode};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use leftover_core::{CodeError, OneTimeCode, PhoneNumber};

/// Errors from verifying a code.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The submitted code has the wrong shape.
    #[error(transparent)]
    MalformedCode(#[from] CodeError),

    /// No code is pending for the phone (never issued, consumed or expired).
    #[error("No verification code found. Please request a new one.")]
    NoCodeRequested,

    /// The pending code is past its expiry; it has been discarded.
    #[error("Verification code expired. Please request a new one.")]
    Expired,

    /// The code does not match. The pending code stays valid.
    #[error("Invalid verification code")]
    InvalidCode,
}

/// Issues and checks one-time codes.
pub struct CodeVerifier<C> {
    codes: C,
    delivery: Arc<dyn CodeDelivery>,
    ttl: TimeDelta,
}

impl<C: CodeStore> CodeVerifier<C> {
    /// Default validity window of a code.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    #[must_use]
    pub fn new(codes: C, delivery: Arc<dyn CodeDelivery>, ttl: Duration) -> Self {
        Self {
            codes,
            delivery,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Generate, store and deliver a fresh code for `phone`.
    ///
    /// Delivery failures are logged and otherwise ignored: the code stays
    /// pending and the caller still gets the entry back.
    pub async fn issue(&self, phone: &PhoneNumber) -> PendingCode {
        self.issue_at(phone, Utc::now()).await
    }

    /// [`issue`](Self::issue) with an explicit clock.
    pub async fn issue_at(&self, phone: &PhoneNumber, now: DateTime<Utc>) -> PendingCode {
        let pending = PendingCode {
            code: OneTimeCode::generate(),
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.codes.put(phone.clone(), pending.clone()).await;

        if let Err(e) = self.delivery.deliver(phone, &pending.code).await {
            warn!(phone = %phone.masked(), error = %e, "Code delivery failed");
        }
        info!(phone = %phone.masked(), expires_at = %pending.expires_at, "Verification code issued");

        pending
    }

    /// Check `code` against the pending entry and consume it on a match.
    ///
    /// # Errors
    ///
    /// See [`VerificationError`]; a malformed code is rejected before any lookup.
    pub async fn verify(&self, phone: &PhoneNumber, code: &str) -> Result<(), VerificationError> {
        self.verify_at(phone, code, Utc::now()).await
    }

    /// [`verify`](Self::verify) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`VerificationError`].
    pub async fn verify_at(
        &self,
        phone: &PhoneNumber,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let code = OneTimeCode::parse(code)?;
        let pending = self
            .codes
            .get(phone)
            .await
            .ok_or(VerificationError::NoCodeRequested)?;

        if pending.is_expired_at(now) {
            // Only drop the entry we judged; a newer code may have replaced it.
            self.codes.remove_if(phone, &pending).await;
            debug!(phone = %phone.masked(), "Verification code expired");
            return Err(VerificationError::Expired);
        }
        if pending.code != code {
            debug!(phone = %phone.masked(), "Verification code mismatch");
            return Err(VerificationError::InvalidCode);
        }

        // Lost to a concurrent verify of the same code, or replaced meanwhile.
        if !self.codes.remove_if(phone, &pending).await {
            return Err(VerificationError::NoCodeRequested);
        }

        info!(phone = %phone.masked(), "Phone verified");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FailingDelivery;

    impl CodeDelivery for FailingDelivery {
        fn deliver<'a>(&'a self, _: &'a PhoneNumber, _: &'a OneTimeCode) -> DeliveryFuture<'a> {
            Box::pin(async { Err(DeliveryError("gateway down".to_owned())) })
        }
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<String>>);

    impl CodeDelivery for Outbox {
        fn deliver<'a>(&'a self, _: &'a PhoneNumber, code: &'a OneTimeCode) -> DeliveryFuture<'a> {
            self.0.lock().unwrap().push(code.as_str().to_owned());
            Box::pin(async { Ok(()) })
        }
    }

    fn verifier() -> CodeVerifier<MemoryCodeStore> {
        CodeVerifier::new(
            MemoryCodeStore::new(),
            Arc::new(LogDelivery),
            CodeVerifier::<MemoryCodeStore>::DEFAULT_TTL,
        )
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("0912345678").unwrap()
    }

    /// A six-digit code different from `code`.
    fn other_than(code: &OneTimeCode) -> String {
        if code.as_str() == "000000" {
            "000001".to_owned()
        } else {
            "000000".to_owned()
        }
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let verifier = verifier();
        let pending = verifier.issue(&phone()).await;

        verifier.verify(&phone(), pending.code.as_str()).await.unwrap();
        let again = verifier.verify(&phone(), pending.code.as_str()).await;
        assert!(matches!(again, Err(VerificationError::NoCodeRequested)));
    }

    #[tokio::test]
    async fn test_mismatch_keeps_pending_code() {
        let verifier = verifier();
        let pending = verifier.issue(&phone()).await;

        let wrong = verifier.verify(&phone(), &other_than(&pending.code)).await;
        assert!(matches!(wrong, Err(VerificationError::InvalidCode)));
        verifier.verify(&phone(), pending.code.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_is_discarded() {
        let verifier = verifier();
        let now = Utc::now();
        let pending = verifier.issue_at(&phone(), now).await;
        let late = now + chrono::Duration::seconds(301);

        let expired = verifier.verify_at(&phone(), pending.code.as_str(), late).await;
        assert!(matches!(expired, Err(VerificationError::Expired)));

        let after = verifier.verify_at(&phone(), pending.code.as_str(), late).await;
        assert!(matches!(after, Err(VerificationError::NoCodeRequested)));
    }

    #[tokio::test]
    async fn test_code_valid_until_window_closes() {
        let verifier = verifier();
        let now = Utc::now();
        let pending = verifier.issue_at(&phone(), now).await;

        verifier
            .verify_at(&phone(), pending.code.as_str(), now + chrono::Duration::seconds(300))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_code_rejected() {
        let verifier = verifier();
        let result = verifier.verify(&phone(), "123").await;
        assert!(matches!(result, Err(VerificationError::MalformedCode(_))));
    }

    #[tokio::test]
    async fn test_no_code_requested() {
        let result = verifier().verify(&phone(), "123456").await;
        assert!(matches!(result, Err(VerificationError::NoCodeRequested)));
    }

    #[tokio::test]
    async fn test_reissue_replaces_pending_code() {
        let verifier = verifier();
        verifier.issue(&phone()).await;
        let latest = verifier.issue(&phone()).await;

        assert_eq!(verifier.codes.get(&phone()).await, Some(latest.clone()));
        verifier.verify(&phone(), latest.code.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_failure_still_stores_code() {
        let verifier = CodeVerifier::new(
            MemoryCodeStore::new(),
            Arc::new(FailingDelivery),
            Duration::from_secs(60),
        );
        let pending = verifier.issue(&phone()).await;

        verifier.verify(&phone(), pending.code.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivered_code_matches_stored_code() {
        let outbox = Arc::new(Outbox::default());
        let verifier = CodeVerifier::new(
            MemoryCodeStore::new(),
            Arc::clone(&outbox) as Arc<dyn CodeDelivery>,
            Duration::from_secs(60),
        );
        let pending = verifier.issue(&phone()).await;

        let sent = outbox.0.lock().unwrap().clone();
        assert_eq!(sent, vec![pending.code.as_str().to_owned()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verifies_have_one_winner() {
        let verifier = Arc::new(verifier());
        let pending = verifier.issue(&phone()).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let verifier = Arc::clone(&verifier);
                let code = pending.code.as_str().to_owned();
                tokio::spawn(async move { verifier.verify(&phone(), &code).await.is_ok() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
