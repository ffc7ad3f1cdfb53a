//! Outbound message delivery.
//!
//! [`Transport`] is the single "send one message" port. [`DeliveryQueue`]
//! sits in front of it and serializes every send.

pub mod email;
pub mod log;
pub mod queue;
pub mod transport;

pub use email::{EmailConfig, SmtpTransport};
pub use log::LogTransport;
pub use queue::{
    DeliveryError, DeliveryHandle, DeliveryOutcome, DeliveryQueue, QueueConfig, QueueError,
};
pub use transport::{Transport, TransportError};

#[cfg(test)]
pub(crate) mod test_support;
