//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub relay: ServerConfig,
    pub jwt: JwtConfig,
    pub typing: TypingConfig,
    pub connection: ConnectionConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens minted by `JwtService::issue`, in seconds
    #[serde(default = "default_token_expiry")]
    pub token_expiry: i64,
    #[serde(default)]
    pub audience: Option<String>,
}

/// Typing session timing
#[derive(Debug, Clone, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Zero disables coalescing
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,
}

impl TypingConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    #[must_use]
    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            coalesce_ms: default_coalesce_ms(),
        }
    }
}

/// Connection and queue sizing
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_connection_buffer")]
    pub buffer: usize,
    #[serde(default = "default_hub_buffer")]
    pub hub_buffer: usize,
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    #[serde(default = "default_keepalive_timeout_ms")]
    pub keepalive_timeout_ms: u64,
}

impl ConnectionConfig {
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    #[must_use]
    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_millis(self.keepalive_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            buffer: default_connection_buffer(),
            hub_buffer: default_hub_buffer(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            keepalive_timeout_ms: default_keepalive_timeout_ms(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "formwatch-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_token_expiry() -> i64 {
    3600 // 1 hour
}

fn default_idle_timeout_ms() -> u64 {
    1500
}

fn default_coalesce_ms() -> u64 {
    200
}

fn default_connection_buffer() -> usize {
    256
}

fn default_hub_buffer() -> usize {
    1024
}

fn default_keepalive_interval_ms() -> u64 {
    25_000
}

fn default_keepalive_timeout_ms() -> u64 {
    60_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Returns an error if required variables are missing or invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: vars.parse_or("APP_ENV", default_env)?,
            },
            relay: ServerConfig {
                host: vars.get("RELAY_HOST").unwrap_or_else(default_host),
                port: vars.parse_required("RELAY_PORT")?,
            },
            jwt: JwtConfig {
                secret: vars.required("JWT_SECRET")?,
                token_expiry: vars.parse_or("JWT_TOKEN_EXPIRY", default_token_expiry)?,
                audience: vars.get("JWT_AUDIENCE"),
            },
            typing: TypingConfig {
                idle_timeout_ms: vars.parse_or("TYPING_IDLE_TIMEOUT_MS", default_idle_timeout_ms)?,
                coalesce_ms: vars.parse_or("TYPING_COALESCE_MS", default_coalesce_ms)?,
            },
            connection: ConnectionConfig {
                buffer: vars.parse_or("CONNECTION_BUFFER", default_connection_buffer)?,
                hub_buffer: vars.parse_or("HUB_BUFFER", default_hub_buffer)?,
                keepalive_interval_ms: vars
                    .parse_or("KEEPALIVE_INTERVAL_MS", default_keepalive_interval_ms)?,
                keepalive_timeout_ms: vars
                    .parse_or("KEEPALIVE_TIMEOUT_MS", default_keepalive_timeout_ms)?,
            },
            cors: CorsConfig {
                allowed_origins: vars
                    .get("CORS_ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingVar(key))
    }

    fn parse_required<T: FromStr>(&self, key: &'static str) -> Result<T, ConfigError> {
        let raw = self.required(key)?;
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw))
    }

    fn parse_or<T: FromStr>(
        &self,
        key: &'static str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(default()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
