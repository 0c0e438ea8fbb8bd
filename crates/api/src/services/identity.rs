//! Identity resolution.
//!
//! Every login path ends here: a [`Credential`] is looked up by its
//! `(provider, subject)` key and a user is created on first sight.

use thiserror::Error;
use tracing::{debug, info};

use leftover_core::{Credential, UserId};

use crate::models::{NewUser, User};
use crate::store::{RepositoryError, UserStore};

/// Errors that can occur while resolving an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Insert lost a uniqueness race, yet the winning row cannot be read back.
    #[error("user for {provider} credential missing after conflicting insert")]
    Unresolved { provider: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Optional attributes supplied with a login.
///
/// They only take effect when the user is created; existing users are
/// returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct LoginAttributes {
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

/// Resolves credentials to users, creating them when absent.
pub struct IdentityResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: UserStore> IdentityResolver<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Return the user behind `credential`, creating it on first login.
    ///
    /// Concurrent first logins with the same credential all return the same
    /// user: the losing insert sees a uniqueness conflict and re-reads.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` if storage fails.
    /// Returns `IdentityError::Unresolved` if a conflicting row cannot be read back.
    pub async fn resolve(
        &self,
        credential: Credential,
        attributes: LoginAttributes,
    ) -> Result<User, IdentityError> {
        if let Some(user) = self
            .store
            .find_by_credential(credential.provider(), credential.subject())
            .await?
        {
            return Ok(user);
        }

        let provider = credential.provider().to_owned();
        let subject = credential.subject().to_owned();
        let new_user = NewUser {
            id: UserId::generate(),
            credential,
            email: attributes.email,
            wallet_address: attributes.wallet_address,
        };

        match self.store.insert_user(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, provider = %user.auth_provider, "Created user");
                Ok(user)
            }
            Err(RepositoryError::Conflict(detail)) => {
                debug!(provider = %provider, detail = %detail, "Concurrent first login, re-reading");
                self.store
                    .find_by_credential(&provider, &subject)
                    .await?
                    .ok_or(IdentityError::Unresolved { provider })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use leftover_core::PhoneNumber;

    use super::*;
    use crate::store::memory::MemoryStore;

    /// Loses every insert to a competitor that registers the same credential
    /// just before it.
    struct RacingStore {
        inner: MemoryStore,
    }

    impl UserStore for RacingStore {
        async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
            self.inner.find_user(id).await
        }

        async fn find_by_credential(
            &self,
            provider: &str,
            subject: &str,
        ) -> Result<Option<User>, RepositoryError> {
            self.inner.find_by_credential(provider, subject).await
        }

        async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
            let competitor = NewUser {
                id: UserId::generate(),
                credential: user.credential.clone(),
                email: None,
                wallet_address: None,
            };
            self.inner.insert_user(competitor).await?;
            self.inner.insert_user(user).await
        }
    }

    fn google(subject: &str) -> Credential {
        Credential::external("google", subject).unwrap()
    }

    #[tokio::test]
    async fn test_first_login_creates_user() {
        let store = MemoryStore::new();
        let user = IdentityResolver::new(&store)
            .resolve(
                google("alice"),
                LoginAttributes {
                    email: Some("alice@example.com".to_owned()),
                    wallet_address: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(user.auth_provider, "google");
        assert_eq!(user.auth_id, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert!(!user.is_merchant);
    }

    #[tokio::test]
    async fn test_repeat_login_returns_same_user_unchanged() {
        let store = MemoryStore::new();
        let resolver = IdentityResolver::new(&store);

        let first = resolver
            .resolve(google("bob"), LoginAttributes::default())
            .await
            .unwrap();
        let second = resolver
            .resolve(
                google("bob"),
                LoginAttributes {
                    email: Some("new@example.com".to_owned()),
                    wallet_address: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, None);
    }

    #[tokio::test]
    async fn test_conflicting_insert_falls_back_to_winner() {
        let store = RacingStore {
            inner: MemoryStore::new(),
        };

        let user = IdentityResolver::new(&store)
            .resolve(google("carol"), LoginAttributes::default())
            .await
            .unwrap();

        let winner = store
            .inner
            .find_by_credential("google", "carol")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, winner.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_logins_share_one_id() {
        let store = MemoryStore::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    IdentityResolver::new(&store)
                        .resolve(google("dave"), LoginAttributes::default())
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_phone_credential_sets_phone_column() {
        let store = MemoryStore::new();
        let phone = PhoneNumber::parse("0912-345-678").unwrap();

        let user = IdentityResolver::new(&store)
            .resolve(Credential::Phone(phone.clone()), LoginAttributes::default())
            .await
            .unwrap();

        assert_eq!(user.auth_provider, Credential::PHONE_PROVIDER);
        assert_eq!(user.auth_id, phone.as_str());
        assert_eq!(user.phone, Some(phone));
    }
}
