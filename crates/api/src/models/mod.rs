//! Domain models for the marketplace service.
//!
//! These are validated domain objects, separate from the database row types in
//! [`crate::db`] and from the request/response bodies in [`crate::routes`].

pub mod listing;
pub mod merchant;
pub mod order;
pub mod social;
pub mod user;

pub use listing::{Listing, ListingFilter, ListingView, NewListing};
pub use merchant::{MerchantProfile, MerchantSearch, MerchantStats, MerchantSummary};
pub use order::{LockedListing, NewOrder, Order};
pub use social::{
    FavoriteMerchant, NewNotification, NewReview, Notification, RatingSummary, Review,
};
pub use user::{NewUser, User};
