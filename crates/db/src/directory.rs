//! [`UserDirectory`] implementation over PostgreSQL.

use airwatch_core::directory::{DirectoryError, UserDirectory};
use airwatch_core::types::DbId;
use airwatch_core::user::User;
use async_trait::async_trait;

use crate::repositories::UserRepo;
use crate::DbPool;

/// User directory backed by the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> DirectoryError {
    tracing::error!(error = %err, "User directory query failed");
    DirectoryError::Backend(err.to_string())
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DirectoryError> {
        let row = UserRepo::find_by_id(&self.pool, id).await.map_err(backend)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let row = UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(backend)?;
        Ok(row.map(User::from))
    }

    async fn save(&self, user: &User) -> Result<(), DirectoryError> {
        if UserRepo::save(&self.pool, user).await.map_err(backend)? {
            Ok(())
        } else {
            Err(DirectoryError::NotFound { id: user.id })
        }
    }
}
