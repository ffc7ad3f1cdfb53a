//! Airwatch notification delivery.
//!
//! - [`delivery::DeliveryQueue`]: bounded FIFO queue drained by a single
//!   paced worker; at most one transport call is in flight at any time.
//! - [`delivery::Transport`]: the outbound mail port, with an SMTP
//!   implementation ([`delivery::SmtpTransport`]) and a logging fallback
//!   ([`delivery::LogTransport`]).
//! - [`Notifier`]: glue that applies the alert policy, submits messages and
//!   stamps the cooldown in the user directory.

pub mod delivery;
pub mod notifier;

pub use delivery::{
    DeliveryError, DeliveryHandle, DeliveryOutcome, DeliveryQueue, EmailConfig, LogTransport,
    QueueConfig, QueueError, SmtpTransport, Transport, TransportError,
};
pub use notifier::{AlertDispatch, Notifier, NotifyError};
