//! Tracing and logging setup
//!
//! The relay logs one line per lifecycle change (connect, disconnect, typing
//! session start/end) with structured `connection_id`, `user_id` and `field`
//! fields. `RUST_LOG` always wins over the preset directives.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::Environment;

/// Directives that keep transport crates quiet unless asked for
const QUIET_TRANSPORT: &str = "hyper=warn,tungstenite=warn,tokio_tungstenite=warn";

/// Output encoding of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one event per line
    Pretty,
    /// One JSON object per line for log shippers
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub directives: String,
    pub format: LogFormat,
    /// Log span open/close, useful to time connection tasks
    pub span_events: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            directives: format!("info,{QUIET_TRANSPORT}"),
            format: LogFormat::Pretty,
            span_events: false,
            file_line: true,
        }
    }
}

impl TracingConfig {
    /// Pick the preset matching the deployment environment
    ///
    /// Development traces the relay crates at debug, which includes every
    /// dropped inbound frame. Production emits JSON at info.
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                directives: format!(
                    "info,formwatch_relay=debug,formwatch_core=debug,{QUIET_TRANSPORT}"
                ),
                span_events: true,
                ..Self::default()
            },
            Environment::Staging => Self::default(),
            Environment::Production => Self {
                format: LogFormat::Json,
                file_line: false,
                ..Self::default()
            },
        }
    }

    /// Replace the fallback filter directives
    #[must_use]
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.directives)
            .map_err(|e| TracingError::InvalidDirectives(e.to_string()))
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_file(self.file_line)
            .with_line_number(self.file_line)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Pretty => layer.boxed(),
        }
    }
}

/// Install the global subscriber with the default preset
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Install the global subscriber
///
/// Fails instead of panicking when a subscriber is already set, so tests and
/// the binary can both call it.
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(env_filter)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    #[error("Invalid log filter directives: {0}")]
    InvalidDirectives(String),
}
