//! Leftover Core - Shared domain types.
//!
//! This crate provides the domain vocabulary used across all Leftover components:
//! - `api` - The marketplace HTTP service
//! - `cli` - Command-line tools for migrations and demo data
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database access,
//! no HTTP. Anything that needs a clock or a random source takes it from the caller
//! or uses the thread-local generator.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, listing/order statuses, phone numbers, one-time codes,
//!   ratings, pricing and coordinates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
