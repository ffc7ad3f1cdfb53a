//! Transport that only logs.
//!
//! Used when no SMTP relay is configured so the rest of the pipeline (queue,
//! pacing, cooldown) still runs end to end in development.

use airwatch_core::message::MessageRequest;
use async_trait::async_trait;

use super::transport::{Transport, TransportError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, message: &MessageRequest) -> Result<(), TransportError> {
        tracing::info!(
            to = %message.recipient,
            subject = %message.subject,
            body_len = message.body.len(),
            "SMTP not configured, logging message instead of sending"
        );
        Ok(())
    }
}
