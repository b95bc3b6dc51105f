//! Session repository.
//!
//! A session is usable only while `is_active` holds and `expires_at` lies in
//! the future. Deactivation never deletes; only the expiry sweep does.

use chrono::{DateTime, Utc};

use super::DbPool;
use crate::{Result, VoyError};

const SESSION_COLUMNS: &str = "id, user_id, token_hash, user_agent, ip_address, is_active, \
                               expires_at, created_at, updated_at, deleted_at";

/// Session entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Session ID (UUID v4).
    pub id: String,
    /// Owning user.
    pub user_id: i64,
    /// SHA-256 of the token issued for this session.
    pub token_hash: String,
    /// Client user agent at creation.
    pub user_agent: String,
    /// Client IP at creation.
    pub ip_address: String,
    /// Cleared on logout.
    pub is_active: bool,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// New session for creation.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Session ID (UUID v4).
    pub id: String,
    /// Owning user.
    pub user_id: i64,
    /// SHA-256 of the issued token.
    pub token_hash: String,
    /// Client user agent.
    pub user_agent: String,
    /// Client IP.
    pub ip_address: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Persist a new active session.
    pub async fn create(&self, new_session: &NewSession) -> Result<Session> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, user_agent, ip_address, is_active,
                                   expires_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8)",
        )
        .bind(&new_session.id)
        .bind(new_session.user_id)
        .bind(&new_session.token_hash)
        .bind(&new_session.user_agent)
        .bind(&new_session.ip_address)
        .bind(new_session.expires_at)
        .bind(new_session.created_at)
        .bind(new_session.created_at)
        .execute(self.pool)
        .await?;

        self.get_by_id(&new_session.id)
            .await?
            .ok_or_else(|| VoyError::NotFound("session".to_string()))
    }

    /// Get a session by ID regardless of its state.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(session)
    }

    /// Find the live session a token refers to.
    ///
    /// Matches on owner, session id and stored token hash, and requires the
    /// session to be active, unexpired at `now` and not soft-deleted.
    pub async fn find_live(
        &self,
        user_id: i64,
        session_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE id = $1
               AND user_id = $2
               AND token_hash = $3
               AND is_active = TRUE
               AND expires_at > $4
               AND deleted_at IS NULL"
        );
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        Ok(session)
    }

    /// List a user's sessions, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE user_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id"
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(sessions)
    }

    /// Deactivate one session of a user.
    ///
    /// Returns the number of sessions whose flag flipped (0 or 1).
    pub async fn deactivate(
        &self,
        user_id: i64,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, updated_at = $1
             WHERE id = $2 AND user_id = $3 AND is_active = TRUE",
        )
        .bind(now)
        .bind(session_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deactivate every active session of a user.
    pub async fn deactivate_all(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, updated_at = $1
             WHERE user_id = $2 AND is_active = TRUE",
        )
        .bind(now)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every session that expired before `now`, active or not.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
