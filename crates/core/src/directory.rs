//! User directory port.
//!
//! [`UserDirectory`] is how the notification core reads users and persists
//! the `last_sent_at` stamp after an alert is accepted for delivery. The
//! PostgreSQL implementation lives in `airwatch-db`;
//! [`InMemoryUserDirectory`] backs local development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::DbId;
use crate::user::User;

/// Failure reading or writing the user directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// `save` was called for a user the directory does not know.
    #[error("User {id} not found in directory")]
    NotFound { id: DbId },

    /// The backing store failed (connection, query, decode).
    #[error("Directory backend error: {0}")]
    Backend(String),
}

/// Read/write access to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    /// Persist the user's mutable fields (username, email, preferences).
    async fn save(&self, user: &User) -> Result<(), DirectoryError>;
}

/// Process-local directory keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<DbId, User>>,
}

impl InMemoryUserDirectory {
    /// Seed the directory with `users`, replacing entries with the same id.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(DirectoryError::NotFound { id: user.id }),
        }
    }
}
