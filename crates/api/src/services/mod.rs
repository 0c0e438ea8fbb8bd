//! Business logic for the marketplace.
//!
//! Services borrow an explicitly passed storage handle (any type implementing
//! the traits in [`crate::store`]) and never reach for global state.
//!
//! # Services
//!
//! - [`identity`] - Map external credentials and phones to stable user ids
//! - [`tokens`] - Session token issue/verify
//! - [`verification`] - One-time phone codes
//! - [`listings`] - Listing creation and browsing
//! - [`purchase`] - The atomic claim of a listing
//! - [`merchants`] - Merchant profiles and search
//! - [`social`] - Reviews, favorites and notifications

pub mod identity;
pub mod listings;
pub mod merchants;
pub mod purchase;
pub mod social;
pub mod tokens;
pub mod verification;
