//! Refresh token repository for JWT authentication.

use chrono::{Duration, Utc};

use super::DbPool;
use crate::{Result, ServdeskError};

/// Timestamp format shared with SQLite's `datetime('now')`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Refresh token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Token string.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    /// User ID.
    pub user_id: i64,
    /// Token string.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: String,
}

impl NewRefreshToken {
    /// Issue a fresh random token for `user_id` that expires after `days`.
    pub fn issue(user_id: i64, days: u64) -> Self {
        let expires_at = Utc::now() + Duration::days(days as i64);
        Self {
            user_id,
            token: uuid::Uuid::new_v4().to_string(),
            expires_at: expires_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ServdeskError::NotFound("refresh token".into()))
    }

    /// Get a refresh token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(token)
    }

    /// Get a refresh token by token string.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a valid (not expired, not revoked) refresh token.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE token = ?
               AND revoked_at IS NULL
               AND expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Revoke `old` and store `replacement` atomically.
    ///
    /// Returns `None` when `old` was already revoked or is unknown, in which
    /// case nothing is written.
    pub async fn rotate(
        &self,
        old: &str,
        replacement: &NewRefreshToken,
    ) -> Result<Option<RefreshToken>> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(old)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            return Ok(None);
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(replacement.user_id)
        .bind(&replacement.token)
        .bind(&replacement.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Revoke a refresh token.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke all tokens for a user.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete expired and revoked tokens (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE expires_at < datetime('now') OR revoked_at IS NOT NULL",
        )
        .execute(self.pool)
        .await
        .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (username, password, email) VALUES (?, ?, ?)")
            .bind("testuser")
            .bind("hashedpassword")
            .bind("test@example.com")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    fn token(value: &str, expires_at: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id: 1,
            token: value.to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[test]
    fn test_issue_generates_future_expiry() {
        let issued = NewRefreshToken::issue(7, 7);
        assert_eq!(issued.user_id, 7);
        assert_eq!(issued.token.len(), 36);
        let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        assert!(issued.expires_at > now);
    }

    #[tokio::test]
    async fn test_create_and_get_by_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        let created = repo
            .create(&token("lookup-token", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_eq!(created.user_id, 1);
        assert!(created.revoked_at.is_none());

        let found = repo.get_by_token("lookup-token").await.unwrap();
        assert_eq!(found.unwrap().id, created.id);
        assert!(repo.get_by_token("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_valid_token_skips_expired() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("valid-token", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token("expired-token", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_token("valid-token").await.unwrap().is_some());
        assert!(repo.get_valid_token("expired-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_revokes_old_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("first", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        let rotated = repo
            .rotate("first", &token("second", "2099-12-31 23:59:59"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rotated.token, "second");
        assert!(repo.get_valid_token("first").await.unwrap().is_none());
        assert!(repo.get_valid_token("second").await.unwrap().is_some());

        // Replaying the old token must not mint another one.
        let replay = repo
            .rotate("first", &token("third", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert!(replay.is_none());
        assert!(repo.get_by_token("third").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("revoke-me", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(repo.revoke("revoke-me").await.unwrap());
        assert!(!repo.revoke("revoke-me").await.unwrap());
        assert!(repo.get_valid_token("revoke-me").await.unwrap().is_none());

        let exists = repo.get_by_token("revoke-me").await.unwrap().unwrap();
        assert!(exists.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        for i in 0..3 {
            repo.create(&token(&format!("user-token-{i}"), "2099-12-31 23:59:59"))
                .await
                .unwrap();
        }

        assert_eq!(repo.revoke_all_for_user(1).await.unwrap(), 3);
        for i in 0..3 {
            let found = repo
                .get_valid_token(&format!("user-token-{i}"))
                .await
                .unwrap();
            assert!(found.is_none());
        }
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("old-expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&token("revoked", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.revoke("revoked").await.unwrap();
        repo.create(&token("still-valid", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
        assert!(repo.get_by_token("old-expired").await.unwrap().is_none());
        assert!(repo.get_by_token("revoked").await.unwrap().is_none());
        assert!(repo.get_by_token("still-valid").await.unwrap().is_some());
    }
}
