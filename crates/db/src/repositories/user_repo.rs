//! Repository for the `users` table.

use airwatch_core::types::DbId;
use airwatch_core::user::User;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UserRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, email_enabled, good_alert_enabled, \
                        bad_alert_enabled, good_threshold, bad_threshold, cooldown_ms, \
                        last_notification_sent_at, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user with default notification preferences.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-sensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Write back every mutable column of `user`, including its preferences.
    ///
    /// Returns `false` if no row with `user.id` exists.
    pub async fn save(pool: &PgPool, user: &User) -> Result<bool, sqlx::Error> {
        let prefs = &user.preferences;
        let result = sqlx::query(
            "UPDATE users SET
                username = $2,
                email = $3,
                email_enabled = $4,
                good_alert_enabled = $5,
                bad_alert_enabled = $6,
                good_threshold = $7,
                bad_threshold = $8,
                cooldown_ms = $9,
                last_notification_sent_at = $10
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(prefs.email_enabled)
        .bind(prefs.good_alert_enabled)
        .bind(prefs.bad_alert_enabled)
        .bind(prefs.good_threshold)
        .bind(prefs.bad_threshold)
        .bind(prefs.cooldown_ms)
        .bind(prefs.last_sent_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
