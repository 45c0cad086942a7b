//! Configuration module for servdesk.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ServdeskError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/servdesk.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event, fields flattened.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file; empty logs to stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/servdesk.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            format: LogFormat::default(),
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Swallow (and log) delivery errors instead of returning them.
    #[serde(default)]
    pub fail_silently: bool,
    /// SMTP port on the resolved exchange host.
    #[serde(default = "default_mail_port")]
    pub port: u16,
    /// Connect and per-command timeout in seconds.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
    /// DNS query timeout in seconds.
    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_secs: u64,
    /// Name announced in EHLO.
    #[serde(default = "default_hello_name")]
    pub hello_name: String,
    /// Sender used when a request does not name one.
    #[serde(default = "default_from")]
    pub default_from: String,
}

fn default_mail_port() -> u16 {
    25
}

fn default_mail_timeout() -> u64 {
    10
}

fn default_dns_timeout() -> u64 {
    5
}

fn default_hello_name() -> String {
    "localhost".to_string()
}

fn default_from() -> String {
    "noreply@localhost".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            fail_silently: false,
            port: default_mail_port(),
            timeout_secs: default_mail_timeout(),
            dns_timeout_secs: default_dns_timeout(),
            hello_name: default_hello_name(),
            default_from: default_from(),
        }
    }
}

/// Bootstrap staff account created at start-up when missing.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Username of the staff account.
    #[serde(default)]
    pub username: String,
    /// Plain-text password, hashed before storage.
    #[serde(default)]
    pub password: String,
    /// Email address of the staff account.
    #[serde(default)]
    pub email: String,
}

impl AdminConfig {
    /// Whether enough information is present to create the account.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Rate limit for login endpoints (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
    /// Maximum CSV upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    7
}

fn default_login_rate_limit() -> u32 {
    5
}

fn default_api_rate_limit() -> u32 {
    100
}

fn default_max_upload_size() -> u64 {
    5
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Outbound mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Bootstrap staff account.
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ServdeskError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ServdeskError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SERVDESK_JWT_SECRET`
    /// - `SERVDESK_MAIL_FAIL_SILENTLY` (`true`/`false`/`1`/`0`)
    /// - `SERVDESK_ADMIN_USERNAME`, `SERVDESK_ADMIN_PASSWORD`, `SERVDESK_ADMIN_EMAIL`
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("SERVDESK_JWT_SECRET") {
            self.web.jwt_secret = secret;
        }
        if let Some(flag) = non_empty_env("SERVDESK_MAIL_FAIL_SILENTLY") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.mail.fail_silently = true,
                "0" | "false" | "no" => self.mail.fail_silently = false,
                other => tracing::warn!("Ignoring SERVDESK_MAIL_FAIL_SILENTLY={other}"),
            }
        }
        if let Some(username) = non_empty_env("SERVDESK_ADMIN_USERNAME") {
            self.admin.username = username;
        }
        if let Some(password) = non_empty_env("SERVDESK_ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(email) = non_empty_env("SERVDESK_ADMIN_EMAIL") {
            self.admin.email = email;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(ServdeskError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via SERVDESK_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.mail.timeout_secs == 0 {
            return Err(ServdeskError::Config(
                "mail.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
