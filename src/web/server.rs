//! Web server for servdesk.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::WebConfig;
use crate::db::RefreshTokenRepository;
use crate::mail::Mailer;
use crate::{Database, Result, ServdeskError};

use super::handlers::{AppState, SharedDatabase};
use super::middleware::{JwtState, RateLimitState};
use super::router::{create_health_router, create_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Per-client request limits.
    rate_limit: Arc<RateLimitState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &WebConfig, db: Database, mailer: Option<(Arc<dyn Mailer>, String)>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServdeskError::Config(format!("invalid web server address: {e}")))?;

        let mut app_state = AppState::new(Arc::new(db), config);
        if let Some((mailer, default_from)) = mailer {
            app_state = app_state.with_mailer(mailer, default_from);
        } else {
            tracing::warn!("No mailer configured; /api/mail/send will answer 503");
        }

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.jwt_secret)),
            rate_limit: Arc::new(RateLimitState::new(
                config.login_rate_limit,
                config.api_rate_limit,
            )),
            cors_origins: config.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the token cleanup background task.
    ///
    /// Runs every hour and removes expired and revoked refresh tokens.
    fn start_token_cleanup_task(db: SharedDatabase) {
        tokio::spawn(async move {
            const CLEANUP_INTERVAL_SECS: u64 = 3600;

            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match RefreshTokenRepository::new(db.pool()).cleanup_expired().await {
                    Ok(0) => tracing::debug!("No expired refresh tokens to clean up"),
                    Ok(count) => tracing::info!(
                        deleted_count = count,
                        "Cleaned up expired/revoked refresh tokens"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup refresh tokens"),
                }
            }
        });
    }

    /// Assemble the full application router.
    fn into_router(self) -> (Router, SharedDatabase, Arc<RateLimitState>) {
        let db = self.app_state.db.clone();
        let rate_limit = self.rate_limit.clone();

        let router = create_router(
            self.app_state,
            self.jwt_state,
            self.rate_limit,
            &self.cors_origins,
        )
        .merge(create_health_router())
        .merge(create_swagger_router())
        .layer(CompressionLayer::new());

        (router, db, rate_limit)
    }

    async fn bind(self) -> std::io::Result<(TcpListener, Router)> {
        let addr = self.addr;
        let (router, db, rate_limit) = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        // Background tasks start only after a successful bind
        Self::start_token_cleanup_task(db);
        rate_limit.start_cleanup_task();
        tracing::info!("Token cleanup task started (runs every hour)");

        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, router))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
