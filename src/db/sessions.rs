//! Login sessions.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use super::repository::{parse_timestamp, timestamp, Repository};
use super::users::user_from_row;
use crate::errors::AppError;
use crate::models::User;

/// A stored session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

impl Repository {
    /// Open a session for a user.
    pub async fn create_session(
        &self,
        user_id: &str,
        ttl: Duration,
    ) -> Result<SessionRecord, AppError> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + ttl;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(timestamp(&now))
        .bind(timestamp(&expires_at))
        .execute(&self.pool)
        .await?;

        Ok(SessionRecord {
            token,
            expires_at,
        })
    }

    /// Resolve a session token to its active user.
    ///
    /// Expired sessions are removed and treated as absent, as are sessions of
    /// deactivated users.
    pub async fn find_session_user(&self, token: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            r#"SELECT s.expires_at AS session_expires_at,
                      u.id, u.name, u.email, u.password_hash, u.role, u.station_id,
                      u.active, u.created_at, u.updated_at
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.get("session_expires_at");
        if parse_timestamp(&expires_at) <= Utc::now() {
            self.delete_session(token).await?;
            return Ok(None);
        }

        let user = user_from_row(&row);
        if !user.active {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Remove one session. Removing an unknown token is not an error.
    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove all sessions of a user.
    pub async fn delete_user_sessions(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop every expired session; returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(&Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
