use chrono::{DateTime, Utc};
use qr_login_app::{
    domain::{
        IdentityId, RepoCreateError, RepoError,
        challenge::{ChallengeRecord, ChallengeStatus, ChallengeToken},
    },
    ports::challenge::{ChallengeRepository, ConfirmOutcome},
};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::sqlite::is_unique_violation;

pub struct SqliteChallengeRepository {
    pool: Pool<Sqlite>,
}

impl SqliteChallengeRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &SqliteRow) -> Result<ChallengeRecord, RepoError> {
        let corrupt = |what: &str| RepoError::StorageError(format!("corrupt {} in qr_sessions", what));
        let map_sqlx = |e: sqlx::Error| RepoError::StorageError(e.to_string());

        let token: String = row.try_get("token").map_err(map_sqlx)?;
        let status: String = row.try_get("status").map_err(map_sqlx)?;
        let user_id: Option<i64> = row.try_get("user_id").map_err(map_sqlx)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx)?;
        let expires_at: i64 = row.try_get("expires_at").map_err(map_sqlx)?;

        Ok(ChallengeRecord {
            token: ChallengeToken::parse(&token).ok_or_else(|| corrupt("token"))?,
            status: ChallengeStatus::parse(&status).ok_or_else(|| corrupt("status"))?,
            bound_identity: user_id.map(IdentityId),
            created_at: DateTime::from_timestamp_millis(created_at)
                .ok_or_else(|| corrupt("created_at"))?,
            expires_at: DateTime::from_timestamp_millis(expires_at)
                .ok_or_else(|| corrupt("expires_at"))?,
        })
    }
}

#[async_trait::async_trait]
impl ChallengeRepository for SqliteChallengeRepository {
    async fn insert(&self, record: &ChallengeRecord) -> Result<(), RepoCreateError> {
        sqlx::query(
            "INSERT INTO qr_sessions (token, user_id, status, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.token.as_str())
        .bind(record.bound_identity.map(|id| id.0))
        .bind(record.status.as_str())
        .bind(record.expires_at.timestamp_millis())
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoCreateError::Conflict
            } else {
                RepoCreateError::StorageError(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn find(&self, token: &ChallengeToken) -> Result<Option<ChallengeRecord>, RepoError> {
        let row = sqlx::query(
            "SELECT token, user_id, status, expires_at, created_at FROM qr_sessions WHERE token = ?",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::StorageError(e.to_string()))?;
        row.map(|row| Self::record_from_row(&row)).transpose()
    }

    async fn confirm_if_pending(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, RepoError> {
        let now = now.timestamp_millis();
        let result = sqlx::query(
            "UPDATE qr_sessions SET status = 'confirmed', user_id = ? WHERE token = ? AND status = 'pending' AND expires_at > ?",
        )
        .bind(identity.0)
        .bind(token.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::StorageError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(ConfirmOutcome::Applied);
        }

        // The conditional write missed. Whatever is read now is stable: a row
        // is either gone, expired, or confirmed for good.
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT status, expires_at FROM qr_sessions WHERE token = ?")
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(match row {
            Some((status, expires_at)) if expires_at > now && status == "confirmed" => {
                ConfirmOutcome::AlreadyConfirmed
            }
            _ => ConfirmOutcome::NotFound,
        })
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM qr_sessions WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
