//! Layered runtime configuration.
//!
//! Values come from optional `config/*.toml` files overlaid by `DUSK__`
//! environment variables (for example `DUSK__DATABASE__URL`). A `.env`
//! file is honoured in development via dotenvy. Required values with no
//! default fail the build step so a misconfigured process never starts.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// External identity provider used to reconcile provider-managed
    /// accounts. Absent when the deployment runs credential-only.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Postgres connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. Required.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

/// Session and credential settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. Required.
    pub jwt_secret: SecretString,
    /// Session token lifetime. Defaults to seven days.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Mark the session cookie `Secure`. Off by default so local HTTP
    /// development keeps working.
    #[serde(default)]
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

fn default_token_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

/// External identity provider endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub service_key: SecretString,
}

/// Login throttling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// When set, failure counters live in Redis instead of process
    /// memory so multiple instances share one view of an attacker.
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            redis_url: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
    /// Fallback filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and the environment.
    ///
    /// Sources, later wins: `config/default.toml`, `config/local.toml`
    /// (both optional), then `DUSK__` environment variables with `__`
    /// separating nesting levels.
    pub fn load() -> Result<Self, ConfigError> {
        // Populate the process environment from .env before reading it.
        dotenvy::dotenv().ok();

        let raw = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("DUSK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(ConfigError::Load)?;

        let cfg: Self = raw.try_deserialize().map_err(ConfigError::Parse)?;
        tracing::debug!(
            host = %cfg.server.host,
            port = cfg.server.port,
            pool = cfg.database.max_connections,
            provider = cfg.provider.is_some(),
            "configuration loaded"
        );
        Ok(cfg)
    }
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration sources: {0}")]
    Load(#[source] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Parse(#[source] config::ConfigError),
}
