//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Timeout (per-request deadline, 503 on expiry)
//!
//! Authentication is an extractor, not a layer: handlers that need a caller
//! take [`AuthUser`].

pub mod auth;
pub mod request_id;
pub mod timeout;

pub use auth::AuthUser;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use timeout::timeout_middleware;
