//! The outbound mail port.

use airwatch_core::message::MessageRequest;
use async_trait::async_trait;

/// Error type for a single failed send.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The provider refused the message (quota, policy, unknown recipient).
    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Sends one message to one address.
///
/// Implementations may take arbitrarily long and may pool connections
/// internally. Retries, if any, are the implementation's business; the
/// delivery queue never retries.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, message: &MessageRequest) -> Result<(), TransportError>;
}
