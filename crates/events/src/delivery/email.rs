//! Email delivery via SMTP.
//!
//! [`SmtpTransport`] wraps a pooled `lettre` async SMTP transport built once
//! at startup. Configuration is loaded from environment variables; if
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and the
//! caller should fall back to [`LogTransport`](super::LogTransport).

use std::fmt;

use airwatch_core::message::MessageRequest;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::transport::{Transport, TransportError};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@airwatch.local";

/// Default upper bound on pooled SMTP connections.
const DEFAULT_POOL_MAX_SIZE: u32 = 5;

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Maximum number of pooled SMTP connections.
    pub pool_max_size: u32,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable             | Required | Default                   |
    /// |----------------------|----------|---------------------------|
    /// | `SMTP_HOST`          | yes      | -                         |
    /// | `SMTP_PORT`          | no       | `587`                     |
    /// | `SMTP_FROM`          | no       | `noreply@airwatch.local`  |
    /// | `SMTP_USER`          | no       | -                         |
    /// | `SMTP_PASSWORD`      | no       | -                         |
    /// | `SMTP_POOL_MAX_SIZE` | no       | `5`                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            pool_max_size: std::env::var("SMTP_POOL_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_POOL_MAX_SIZE),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpTransport
// ---------------------------------------------------------------------------

/// Sends plain-text messages through an SMTP relay.
///
/// The underlying `lettre` transport keeps a bounded connection pool, so a
/// single instance should be shared for the lifetime of the process.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    /// Build the pooled SMTP transport.
    ///
    /// Fails if the relay host or the sender address is invalid. No
    /// connection is opened until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, TransportError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .pool_config(PoolConfig::new().max_size(config.pool_max_size));

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, message: &MessageRequest) -> Result<(), TransportError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(message.recipient.parse()?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| TransportError::Build(e.to_string()))?;

        self.mailer.send(email).await?;

        tracing::info!(to = %message.recipient, subject = %message.subject, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
