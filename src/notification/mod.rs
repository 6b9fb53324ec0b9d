//! # Notification Service
//!
//! This module is responsible for delivering alert messages to the operator's
//! Telegram chat. The monitoring core only depends on the [`Notifier`] trait:
//! given a formatted message, the collaborator attempts delivery and reports
//! a boolean outcome. Retry behavior and the fallback from HTML markup to
//! plain text live entirely behind that boundary.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub mod error;
pub mod format;
mod telegram;

pub use telegram::TelegramNotifier;

/// The delivery interface the monitoring cycle depends on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempts to deliver a message, returning `true` only when the channel
    /// confirmed delivery. Failures are logged by the implementation and
    /// never propagate to the caller.
    async fn send(&self, message: &str) -> bool;
}
