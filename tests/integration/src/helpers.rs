//! Test helpers for integration tests
//!
//! Provides utilities for spawning a relay, minting identity tokens and
//! making HTTP requests against it.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use formwatch_common::{AppConfig, JwtService};
use formwatch_core::Identity;
use formwatch_relay::RelayServer;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Secret shared by the test relay and the token minting helpers
pub const TEST_SECRET: &str = "integration-test-secret-key-long-enough";

/// Idle window used by test relays
pub const TEST_IDLE_TIMEOUT_MS: u64 = 300;

/// Coalescing interval used by test relays
pub const TEST_COALESCE_MS: u64 = 50;

/// Running relay instance that manages lifecycle
pub struct TestRelay {
    pub addr: SocketAddr,
    pub client: Client,
    jwt: JwtService,
    server: RelayServer,
}

impl TestRelay {
    /// Start a relay with the test configuration
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config(&[])?).await
    }

    /// Start a relay with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let jwt = JwtService::from_config(&config.jwt);
        let server = RelayServer::bind(config).await?;

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr: server.local_addr(),
            client,
            jwt,
            server,
        })
    }

    /// Get base URL for HTTP requests
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket endpoint URL
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Mint a token for an identity with the relay's secret
    pub fn token_for(&self, identity: Identity) -> Result<String> {
        Ok(self.jwt.issue(identity)?)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Read `/health`
    pub async fn health(&self) -> Result<Value> {
        let response = self.get("/health").await?;
        assert_json(response, StatusCode::OK).await
    }

    /// Wait until the hub has registered exactly `count` connections
    pub async fn wait_for_connections(&self, count: u64) -> Result<()> {
        for _ in 0..100 {
            let health = self.health().await?;
            if health["connections"].as_u64() == Some(count) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("Relay never reached {count} connections")
    }

    /// Close every connection and stop the relay
    pub async fn shutdown(self) -> Result<()> {
        self.server.shutdown().await?;
        Ok(())
    }
}

/// Create a test configuration, overriding defaults with `vars`
///
/// Binds to an ephemeral port on localhost with short typing windows.
pub fn test_config(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let idle = TEST_IDLE_TIMEOUT_MS.to_string();
    let coalesce = TEST_COALESCE_MS.to_string();

    let defaults = [
        ("RELAY_HOST", "127.0.0.1"),
        ("RELAY_PORT", "0"),
        ("JWT_SECRET", TEST_SECRET),
        ("TYPING_IDLE_TIMEOUT_MS", idle.as_str()),
        ("TYPING_COALESCE_MS", coalesce.as_str()),
    ];

    let config = AppConfig::from_lookup(|key| {
        vars.iter()
            .chain(defaults.iter())
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_string())
    })
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    Ok(config)
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}
