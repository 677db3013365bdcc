//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, ConnectionConfig, CorsConfig, Environment, JwtConfig,
    ServerConfig, TypingConfig,
};
