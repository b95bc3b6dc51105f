//! Configuration module for voy-auth.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual values.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VoyError};

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Local development: pretty logs.
    #[default]
    Development,
    /// Production: JSON logs.
    Production,
}

impl AppMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(AppMode::Development),
            "production" | "prod" => Some(AppMode::Production),
            _ => None,
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Service name, used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Deployment mode.
    #[serde(default)]
    pub mode: AppMode,
}

fn default_app_name() -> String {
    "voy-api".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            mode: AppMode::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pool size.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/voy.db".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_db_max_connections(),
        }
    }
}

/// Authentication and session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Token and session lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Cookie `Domain` attribute.
    #[serde(default)]
    pub cookie_domain: Option<String>,
    /// Whether the cookie carries the `Secure` attribute.
    #[serde(default)]
    pub cookie_secure: bool,
    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Upper bound on a single sweep, in seconds.
    #[serde(default = "default_cleanup_timeout")]
    pub cleanup_timeout_secs: u64,
}

/// Longest token and session lifetime accepted: 365 days.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 86_400;

fn default_token_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_cookie_name() -> String {
    "voy_auth".to_string()
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_cleanup_timeout() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
            cookie_name: default_cookie_name(),
            cookie_domain: None,
            cookie_secure: false,
            cleanup_interval_secs: default_cleanup_interval(),
            cleanup_timeout_secs: default_cleanup_timeout(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored when writing to a terminal.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
    /// Output format; follows the app mode when unset.
    #[serde(default)]
    pub format: Option<LogFormat>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            format: None,
        }
    }
}

impl LoggingConfig {
    /// Format to use given the deployment mode.
    pub fn effective_format(&self, mode: AppMode) -> LogFormat {
        self.format.unwrap_or(match mode {
            AppMode::Development => LogFormat::Pretty,
            AppMode::Production => LogFormat::Json,
        })
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Application identity.
    #[serde(default)]
    pub app: AppConfig,
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VoyError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VoyError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `VOY_JWT_SECRET`
    /// - `VOY_DATABASE_URL`
    /// - `VOY_HOST`, `VOY_PORT`
    /// - `VOY_APP_MODE` (`development` / `production`)
    /// - `VOY_CORS_ALLOWED_ORIGINS` (comma separated)
    /// - `VOY_TOKEN_TTL_SECS`
    /// - `VOY_COOKIE_DOMAIN`, `VOY_COOKIE_SECURE`
    /// - `VOY_LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = get("VOY_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = get("VOY_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(host) = get("VOY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("VOY_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| VoyError::Config(format!("invalid VOY_PORT: {port}")))?;
        }
        if let Some(mode) = get("VOY_APP_MODE") {
            self.app.mode = AppMode::parse(&mode)
                .ok_or_else(|| VoyError::Config(format!("invalid VOY_APP_MODE: {mode}")))?;
        }
        if let Some(origins) = get("VOY_CORS_ALLOWED_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(ttl) = get("VOY_TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = ttl
                .trim()
                .parse()
                .map_err(|_| VoyError::Config(format!("invalid VOY_TOKEN_TTL_SECS: {ttl}")))?;
        }
        if let Some(domain) = get("VOY_COOKIE_DOMAIN") {
            self.auth.cookie_domain = Some(domain);
        }
        if let Some(secure) = get("VOY_COOKIE_SECURE") {
            self.auth.cookie_secure = matches!(
                secure.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(level) = get("VOY_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the JWT secret is not set
    /// - the token lifetime is zero or above [`MAX_TOKEN_TTL_SECS`]
    /// - the cleanup interval or cleanup timeout is zero
    /// - the request timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(VoyError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via VOY_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(VoyError::Config(
                "token_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(VoyError::Config(format!(
                "token_ttl_secs must not exceed {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if self.auth.cleanup_interval_secs == 0 {
            return Err(VoyError::Config(
                "cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.cleanup_timeout_secs == 0 {
            return Err(VoyError::Config(
                "cleanup_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(VoyError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
