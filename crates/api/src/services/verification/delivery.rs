//! Delivery channel for one-time codes.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::info;

use leftover_core::{OneTimeCode, PhoneNumber};

/// Delivery failed; no retry is attempted.
#[derive(Debug, Error)]
#[error("code delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Future returned by [`CodeDelivery::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// Sends a code to a phone. Best effort, no delivery guarantee.
///
/// Object safe so the server can pick a channel at runtime.
pub trait CodeDelivery: Send + Sync {
    fn deliver<'a>(&'a self, phone: &'a PhoneNumber, code: &'a OneTimeCode) -> DeliveryFuture<'a>;
}

/// Demo channel: writes the code to the log instead of sending an SMS.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl CodeDelivery for LogDelivery {
    fn deliver<'a>(&'a self, phone: &'a PhoneNumber, code: &'a OneTimeCode) -> DeliveryFuture<'a> {
        Box::pin(async move {
            info!(phone = %phone, code = code.as_str(), "Demo SMS: verification code");
            Ok(())
        })
    }
}
