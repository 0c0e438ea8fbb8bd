//! One-time verification codes.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`OneTimeCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The code is not exactly six characters long.
    #[error("verification code must be exactly {expected} characters")]
    WrongLength {
        /// Required length.
        expected: usize,
    },
}

/// A six-character numeric one-time code.
///
/// Generated codes are uniform over `000000..=999999`; leading zeros are kept so
/// the code is always six characters. Parsing only checks the length: a
/// six-character code that is not all digits can never match a generated one and
/// is rejected as a mismatch rather than as malformed input.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Number of characters in a code.
    pub const LENGTH: usize = 6;

    /// Generate a fresh random code.
    #[must_use]
    pub fn generate() -> Self {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    /// Parse a code submitted by a client.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::WrongLength`] unless the input is exactly six characters.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        if s.chars().count() != Self::LENGTH {
            return Err(CodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are credentials; keep them out of debug output.
impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeCode(******)")
    }
}
