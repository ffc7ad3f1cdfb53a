//! The user record as seen by the notification core.

use serde::Serialize;

use crate::preferences::NotificationPreferences;
use crate::types::DbId;

/// An addressee together with its notification preferences.
///
/// The core reads and stamps these records but never creates or deletes
/// them; that is the directory's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub preferences: NotificationPreferences,
}

impl User {
    pub fn new(id: DbId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            preferences: NotificationPreferences::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: NotificationPreferences) -> Self {
        self.preferences = preferences;
        self
    }
}
