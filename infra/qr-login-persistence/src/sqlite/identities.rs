use qr_login_app::{
    domain::{
        IdentityId, RepoCreateError, RepoError,
        identity::{Identity, normalize_handle},
    },
    ports::identity::IdentityRepository,
};
use sqlx::{Pool, Sqlite};

use crate::sqlite::is_unique_violation;

pub struct SqliteIdentityRepository {
    pool: Pool<Sqlite>,
}

impl SqliteIdentityRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IdentityRepository for SqliteIdentityRepository {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, RepoError> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = ?")
                .bind(normalize_handle(handle))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(row.map(|(id, handle, secret_verifier)| Identity {
            id: IdentityId(id),
            handle,
            secret_verifier,
        }))
    }

    async fn create(
        &self,
        handle: &str,
        secret_verifier: &str,
    ) -> Result<IdentityId, RepoCreateError> {
        let result =
            sqlx::query("INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)")
                .bind(normalize_handle(handle))
                .bind(secret_verifier)
                .bind(chrono::Utc::now().timestamp_millis())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        RepoCreateError::Conflict
                    } else {
                        RepoCreateError::StorageError(e.to_string())
                    }
                })?;
        Ok(IdentityId(result.last_insert_rowid()))
    }
}
