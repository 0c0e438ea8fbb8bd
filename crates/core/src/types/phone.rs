//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// Fewer characters than any plausible phone number.
    #[error("phone number must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input string is too long.
    #[error("phone number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains something other than digits and separators.
    #[error("phone number contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A normalised phone number.
///
/// Separators (spaces, dashes, dots, parentheses) are stripped, so the same
/// number typed two ways maps to the same identity.
///
/// ## Constraints
///
/// - Optional single leading `+`
/// - ASCII digits otherwise
/// - 9-20 characters after normalisation
///
/// ## Examples
///
/// ```
/// use leftover_core::PhoneNumber;
///
/// assert_eq!(PhoneNumber::parse("0912-345-678").unwrap().as_str(), "0912345678");
/// assert!(PhoneNumber::parse("+886 912 345 678").is_ok());
///
/// assert!(PhoneNumber::parse("12345").is_err());      // too short
/// assert!(PhoneNumber::parse("09123x5678").is_err()); // not a digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum length after normalisation.
    pub const MIN_LENGTH: usize = 9;
    /// Maximum length after normalisation.
    pub const MAX_LENGTH: usize = 20;

    /// Parse and normalise a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other than
    /// digits, separators and a leading `+`, or has the wrong length.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut normalized = String::with_capacity(trimmed.len());
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => normalized.push(c),
                '+' if i == 0 => normalized.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        if normalized.len() < Self::MIN_LENGTH {
            return Err(PhoneError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if normalized.len() > Self::MAX_LENGTH {
            return Err(PhoneError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the normalised number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number with all but the last three digits hidden, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let visible = self.0.len().saturating_sub(3);
        let tail = self.0.get(visible..).unwrap_or_default();
        format!("{}{tail}", "*".repeat(visible))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
