//! # formwatch-common
//!
//! Shared utilities including configuration, error handling, identity tokens, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{Claims, IdentityProvider, JwtService};
pub use config::{
    AppConfig, AppSettings, ConfigError, ConnectionConfig, CorsConfig, Environment, JwtConfig,
    ServerConfig, TypingConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    try_init_tracing, try_init_tracing_with_config, LogFormat, TracingConfig, TracingError,
};
