//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p formwatch-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use formwatch_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration before tracing so the environment picks the log format
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.relay.port,
        "Starting relay"
    );

    if let Err(e) = formwatch_relay::run(config).await {
        error!(error = %e, "Relay failed");
        std::process::exit(1);
    }
}
