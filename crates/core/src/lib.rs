//! Airwatch domain layer.
//!
//! Pure building blocks shared by the delivery queue, the database adapter
//! and the HTTP edge:
//!
//! - [`preferences`]: per-user notification preferences and their update DTO.
//! - [`policy`]: the alert decision function ([`policy::evaluate`]).
//! - [`message`]: message catalogue and the [`message::MessageRequest`] value.
//! - [`directory`]: the user directory port and an in-memory adapter.

pub mod directory;
pub mod error;
pub mod message;
pub mod policy;
pub mod preferences;
pub mod types;
pub mod user;
