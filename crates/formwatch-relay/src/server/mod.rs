//! Relay server setup
//!
//! Provides the HTTP router, the WebSocket endpoint and server lifecycle.

mod handler;
mod rejection;
mod state;

pub use handler::{ws_handler, ConnectParams};
pub use rejection::HandshakeRejection;
pub use state::RelayState;

use crate::error::{RelayError, RelayResult};
use crate::hub::{HubConfig, HubHandle, RelayHub};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use formwatch_common::{AppConfig, CorsConfig, IdentityProvider, JwtService};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the relay router
pub fn create_router() -> Router<RelayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check(State(state): State<RelayState>) -> Response {
    match state.hub().stats().await {
        Ok(stats) => Json(json!({
            "status": "ok",
            "connections": stats.connections,
            "users": stats.users,
            "typing_sessions": stats.typing_sessions,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    let cors = create_cors_layer(&state.config().cors, state.config().app.env.is_production());

    create_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the CORS layer from configuration
///
/// In development an empty origin list allows any origin; in production it
/// blocks every cross-origin request.
fn create_cors_layer(config: &CorsConfig, is_production: bool) -> CorsLayer {
    let base_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if !is_production && config.allowed_origins.is_empty() {
        tracing::warn!(
            "CORS: Allowing any origin (development mode). \
             Configure CORS_ALLOWED_ORIGINS for production."
        );
        return base_layer.allow_origin(Any);
    }

    if config.allowed_origins.is_empty() {
        tracing::warn!("CORS: No allowed origins configured in production mode");
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS: Allowing {} configured origins", origins.len());
    base_layer.allow_origin(AllowOrigin::list(origins))
}

/// A running relay: HTTP listener plus hub task
pub struct RelayServer {
    local_addr: SocketAddr,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
    server_task: JoinHandle<RelayResult<()>>,
    stop: oneshot::Sender<()>,
}

impl RelayServer {
    /// Bind the listener, start the hub and start serving
    ///
    /// Identity tokens are validated with the configured JWT secret.
    pub async fn bind(config: AppConfig) -> RelayResult<Self> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtService::from_config(&config.jwt));
        Self::bind_with_identity(config, identity).await
    }

    /// Same as [`RelayServer::bind`] with a custom identity provider
    pub async fn bind_with_identity(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> RelayResult<Self> {
        let addr = config.relay.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| RelayError::Bind { addr, source })?;

        let (hub_task, hub) = RelayHub::spawn(
            HubConfig::from(&config.typing),
            config.connection.hub_buffer,
        );

        let app = create_app(RelayState::new(hub.clone(), identity, config));

        let (stop, stopped) = oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stopped.await;
                })
                .await
                .map_err(RelayError::Serve)
        });

        tracing::info!("Relay listening on ws://{}/ws", local_addr);

        Ok(Self {
            local_addr,
            hub,
            hub_task,
            server_task,
            stop,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the running hub
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Serve until `signal` resolves, then shut down
    pub async fn serve_until<F>(mut self, signal: F) -> RelayResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = &mut self.server_task => {
                self.hub_task.abort();
                return result?;
            }
            () = signal => {
                tracing::info!("Shutdown signal received");
            }
        }
        self.shutdown().await
    }

    /// Close every connection, stop the hub and stop accepting connections
    pub async fn shutdown(self) -> RelayResult<()> {
        // Closing sockets first keeps graceful shutdown from waiting on them
        if self.hub.shutdown().await.is_err() {
            tracing::debug!("Relay hub already stopped");
        }
        let _ = self.hub_task.await;

        let _ = self.stop.send(());
        let result = self.server_task.await?;

        tracing::info!("Relay stopped");
        result
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// Run the relay with configuration until Ctrl-C
pub async fn run(config: AppConfig) -> RelayResult<()> {
    let server = RelayServer::bind(config).await?;
    server.serve_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
