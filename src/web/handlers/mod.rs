//! API handlers.

pub mod auth;
pub mod mail;
pub mod order;
pub mod user;

pub use auth::*;
pub use mail::*;
pub use order::*;
pub use user::*;

use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::config::WebConfig;
use crate::db::{NewRefreshToken, RefreshTokenRepository, User};
use crate::mail::Mailer;
use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;
use crate::Database;

/// Shared database handle.
pub type SharedDatabase = Arc<Database>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry: u64,
    /// Outbound mailer; mail endpoints answer 503 without one.
    pub mailer: Option<Arc<dyn Mailer>>,
    /// Sender used when a request names none.
    pub default_from: String,
    /// Maximum accepted CSV upload in bytes.
    pub max_upload_size: usize,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: SharedDatabase, config: &WebConfig) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_expiry: config.jwt_access_token_expiry_secs,
            refresh_token_expiry: config.jwt_refresh_token_expiry_days,
            mailer: None,
            default_from: "noreply@localhost".to_string(),
            max_upload_size: (config.max_upload_size_mb as usize).saturating_mul(1024 * 1024),
        }
    }

    /// Attach the outbound mailer.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>, default_from: impl Into<String>) -> Self {
        self.mailer = Some(mailer);
        self.default_from = default_from.into();
        self
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Issue a new access token and store a new refresh token.
    pub async fn issue_tokens(&self, user: &User) -> Result<TokenResponse, ApiError> {
        let access = self.generate_access_token(user)?;
        let refresh = NewRefreshToken::issue(user.id, self.refresh_token_expiry);
        RefreshTokenRepository::new(self.db.pool())
            .create(&refresh)
            .await?;

        Ok(TokenResponse {
            access,
            refresh: refresh.token,
            expires_in: self.access_token_expiry,
        })
    }
}
