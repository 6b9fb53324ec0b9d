//! Error types for the notification service.

use thiserror::Error;

/// Defines the possible errors that can occur while sending a notification.
/// Variants discriminate rate limiting from transport failures so callers
/// can log them distinctly.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The channel rejected the request due to rate limiting.
    #[error("Rate limited by Telegram (retry_after_secs: {retry_after_secs:?})")]
    RateLimited {
        /// Seconds to wait before retrying, when the channel reports one.
        retry_after_secs: Option<u64>,
    },

    /// The channel rejected the message content (e.g. malformed markup).
    #[error("Message rejected: {description}")]
    Rejected {
        /// Error description returned by the channel.
        description: String,
    },

    /// A transport-level error from the underlying HTTP client.
    #[error("Request error: {0}")]
    Network(#[from] reqwest_middleware::Error),

    /// Any other failure reported by the channel.
    #[error("Unexpected notification failure: {0}")]
    Unexpected(String),
}
