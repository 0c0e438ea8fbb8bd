//! Listing prices using decimal arithmetic.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`Pricing`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A price is below zero.
    #[error("{0} must not be negative")]
    Negative(&'static str),
    /// The discounted price is above the original.
    #[error("current_price must not exceed original_price")]
    AboveOriginal,
    /// A price has more precision than the store keeps.
    #[error("{0} must have at most 2 decimal places")]
    TooPrecise(&'static str),
    /// A price does not fit the store's `NUMERIC(10, 2)` column.
    #[error("{0} is too large")]
    TooLarge(&'static str),
}

/// The original and discounted price of a listing.
///
/// Surplus food is sold below its shelf price, so the current price may never
/// exceed the original one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Shelf price before the surplus discount.
    pub original: Decimal,
    /// Price the consumer pays.
    pub current: Decimal,
}

impl Pricing {
    /// Largest representable amount (`NUMERIC(10, 2)`).
    const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Validate a price pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either price is negative, too precise or too large,
    /// or if the current price is above the original price.
    pub fn new(original: Decimal, current: Decimal) -> Result<Self, PricingError> {
        check_amount(original, "original_price")?;
        check_amount(current, "current_price")?;
        if current > original {
            return Err(PricingError::AboveOriginal);
        }
        Ok(Self { original, current })
    }

    /// Discount relative to the original price, in whole percent.
    #[must_use]
    pub fn discount_percent(&self) -> u8 {
        if self.original.is_zero() {
            return 0;
        }
        let ratio = (self.original - self.current) / self.original * Decimal::ONE_HUNDRED;
        ratio.round().to_u8().unwrap_or(0)
    }
}

fn check_amount(amount: Decimal, field: &'static str) -> Result<(), PricingError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PricingError::Negative(field));
    }
    if amount.normalize().scale() > 2 {
        return Err(PricingError::TooPrecise(field));
    }
    if amount > Pricing::MAX_AMOUNT {
        return Err(PricingError::TooLarge(field));
    }
    Ok(())
}
