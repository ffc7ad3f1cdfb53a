//! Seed users for running without a database.
//!
//! `SEED_USERS_FILE` points at a JSON array such as:
//!
//! ```json
//! [
//!   { "id": 1, "username": "ada", "email": "ada@example.com" },
//!   { "id": 2, "username": "bob", "email": "bob@example.com",
//!     "preferences": { "bad_threshold": 150, "cooldown_ms": 600000 } }
//! ]
//! ```
//!
//! `preferences` is optional and partial; omitted fields take the defaults.

use std::collections::HashSet;
use std::path::Path;

use airwatch_core::error::CoreError;
use airwatch_core::preferences::{NotificationPreferences, UpdateNotificationPreferences};
use airwatch_core::types::DbId;
use airwatch_core::user::User;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Cannot read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate user id {0} in seed file")]
    DuplicateId(DbId),

    #[error("Invalid preferences for user {id}: {source}")]
    Preferences { id: DbId, source: CoreError },
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: DbId,
    username: String,
    email: String,
    #[serde(default)]
    preferences: Option<UpdateNotificationPreferences>,
}

/// Read and validate the seed file at `path`.
pub fn load_seed_users(path: impl AsRef<Path>) -> Result<Vec<User>, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    parse_seed_users(&raw)
}

/// Parse a JSON seed document into users.
pub fn parse_seed_users(raw: &str) -> Result<Vec<User>, SeedError> {
    let entries: Vec<SeedUser> = serde_json::from_str(raw)?;
    let mut seen = HashSet::new();

    entries
        .into_iter()
        .map(|entry| {
            if !seen.insert(entry.id) {
                return Err(SeedError::DuplicateId(entry.id));
            }

            let mut preferences = NotificationPreferences::default();
            if let Some(update) = &entry.preferences {
                update
                    .apply_to(&mut preferences)
                    .map_err(|source| SeedError::Preferences {
                        id: entry.id,
                        source,
                    })?;
            }

            Ok(User::new(entry.id, entry.username, entry.email).with_preferences(preferences))
        })
        .collect()
}
