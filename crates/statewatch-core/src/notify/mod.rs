//! Notification delivery
//!
//! The dispatcher makes exactly one delivery attempt per call and never
//! touches the state store. Retrying, if it happens at all, is the next
//! scheduled tick's business.

mod ntfy;

pub use ntfy::NtfySender;

use async_trait::async_trait;

use crate::models::Notification;

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level failure or non-success response
    #[error("HTTP error: {0}")]
    Http(String),

    /// Channel misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Delivers a formatted notification over some transport
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Attempt exactly one delivery
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
