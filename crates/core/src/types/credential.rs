//! External credentials that resolve to a user identity.

use super::phone::PhoneNumber;

/// Errors that can occur when building a [`Credential`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The provider name is blank.
    #[error("auth_provider is required")]
    MissingProvider,
    /// The provider's user id is blank.
    #[error("auth_id is required")]
    MissingSubject,
    /// The provider name is reserved for phone verification.
    #[error("auth_provider '{0}' is reserved")]
    ReservedProvider(String),
    /// A field exceeds the storable length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// Something that proves who a user is.
///
/// Every credential reduces to a `(provider, subject)` pair, which is unique
/// across users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    /// An identity asserted by an external provider (OAuth, wallet, ...).
    External {
        /// Provider name, e.g. `google`, `line`, `crypto`.
        provider: String,
        /// The provider's id for the user, or a wallet address.
        subject: String,
    },
    /// A phone number proven by a one-time code.
    Phone(PhoneNumber),
}

impl Credential {
    /// Provider name used for phone identities.
    pub const PHONE_PROVIDER: &'static str = "phone";

    /// Maximum stored length of provider and subject.
    pub const MAX_FIELD_LENGTH: usize = 255;

    /// Build an external credential from client input.
    ///
    /// # Errors
    ///
    /// Returns an error if either part is blank or too long, or if the provider
    /// is the reserved phone provider (phone identities need a verified code).
    pub fn external(provider: &str, subject: &str) -> Result<Self, CredentialError> {
        let provider = provider.trim();
        let subject = subject.trim();

        if provider.is_empty() {
            return Err(CredentialError::MissingProvider);
        }
        if subject.is_empty() {
            return Err(CredentialError::MissingSubject);
        }
        if provider.len() > Self::MAX_FIELD_LENGTH {
            return Err(CredentialError::TooLong {
                field: "auth_provider",
                max: Self::MAX_FIELD_LENGTH,
            });
        }
        if subject.len() > Self::MAX_FIELD_LENGTH {
            return Err(CredentialError::TooLong {
                field: "auth_id",
                max: Self::MAX_FIELD_LENGTH,
            });
        }
        if provider.eq_ignore_ascii_case(Self::PHONE_PROVIDER) {
            return Err(CredentialError::ReservedProvider(provider.to_owned()));
        }

        Ok(Self::External {
            provider: provider.to_owned(),
            subject: subject.to_owned(),
        })
    }

    /// The provider half of the unique key.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::External { provider, .. } => provider,
            Self::Phone(_) => Self::PHONE_PROVIDER,
        }
    }

    /// The subject half of the unique key.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::External { subject, .. } => subject,
            Self::Phone(phone) => phone.as_str(),
        }
    }

    /// The phone number, for phone credentials.
    #[must_use]
    pub const fn phone(&self) -> Option<&PhoneNumber> {
        match self {
            Self::External { .. } => None,
            Self::Phone(phone) => Some(phone),
        }
    }
}
