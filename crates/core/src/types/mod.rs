//! Core types for Leftover.
//!
//! This module provides type-safe wrappers for the marketplace's domain concepts.

pub mod code;
pub mod credential;
pub mod geo;
pub mod id;
pub mod phone;
pub mod price;
pub mod rating;
pub mod status;

pub use code::{CodeError, OneTimeCode};
pub use credential::{Credential, CredentialError};
pub use geo::{BoundingBox, Coordinates, GeoError};
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::{Pricing, PricingError};
pub use rating::{Rating, RatingError};
pub use status::*;
