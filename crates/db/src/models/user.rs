//! User entity model and DTOs.

use airwatch_core::preferences::NotificationPreferences;
use airwatch_core::types::{DbId, Timestamp};
use airwatch_core::user::User;
use serde::Deserialize;
use sqlx::FromRow;

/// Full row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub email_enabled: bool,
    pub good_alert_enabled: bool,
    pub bad_alert_enabled: bool,
    pub good_threshold: f64,
    pub bad_threshold: f64,
    pub cooldown_ms: i64,
    pub last_notification_sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            preferences: NotificationPreferences {
                email_enabled: row.email_enabled,
                good_alert_enabled: row.good_alert_enabled,
                bad_alert_enabled: row.bad_alert_enabled,
                good_threshold: row.good_threshold,
                bad_threshold: row.bad_threshold,
                last_sent_at: row.last_notification_sent_at,
                cooldown_ms: row.cooldown_ms,
            },
        }
    }
}

/// DTO for creating a new user. Preference columns take their defaults.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
}
