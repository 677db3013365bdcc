//! WebSocket handler
//!
//! Authenticates the handshake, then runs one reader and one writer task per
//! connection. Both only talk to the hub through its command channel.

use super::rejection::HandshakeRejection;
use crate::connection::{Connection, ConnectionId, Liveness};
use crate::handlers::MessageDispatcher;
use crate::hub::HubHandle;
use crate::protocol::{CloseCode, Envelope};
use crate::server::RelayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use formwatch_common::AppError;
use formwatch_core::Identity;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Lower bound on the ping period
const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(100);

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Identity token, for clients that cannot set headers
    pub token: Option<String>,
}

/// WebSocket relay handler
///
/// The token comes from `Authorization: Bearer` or `?token=`, header first.
pub async fn ws_handler(
    State(state): State<RelayState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, HandshakeRejection> {
    let token = bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .or(params.token)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingAuth)?;

    let identity = state.identity().authenticate(&token).await.map_err(|e| {
        tracing::warn!(error = %e, "Handshake token rejected");
        HandshakeRejection(e)
    })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(state, identity, socket)))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: RelayState, identity: Identity, socket: WebSocket) {
    let settings = &state.config().connection;
    let keepalive_interval = settings.keepalive_interval();
    let keepalive_timeout = settings.keepalive_timeout();

    // Create message channel for outgoing messages
    let (tx, rx) = mpsc::channel::<Envelope>(settings.buffer.max(1));

    let connection = Connection::new(identity, tx);
    let connection_id = connection.id();

    if state.hub().connect(connection).await.is_err() {
        tracing::warn!(connection_id = %connection_id, "Relay hub unavailable, dropping connection");
        return;
    }

    tracing::info!(
        connection_id = %connection_id,
        user_id = %identity.user_id,
        role = %identity.role,
        "WebSocket connection established"
    );

    let liveness = Liveness::new();
    let (ws_sink, ws_stream) = socket.split();

    let mut recv_task = tokio::spawn(read_loop(
        state.hub().clone(),
        connection_id,
        identity,
        liveness.clone(),
        ws_stream,
    ));

    let mut send_task = tokio::spawn(write_loop(
        connection_id,
        rx,
        ws_sink,
        liveness,
        keepalive_interval,
        keepalive_timeout,
    ));

    // Wait for either side to finish
    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
    }

    recv_task.abort();
    send_task.abort();

    if state.hub().disconnect(connection_id).await.is_err() {
        tracing::debug!(connection_id = %connection_id, "Relay hub already stopped");
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Decode inbound frames and forward them to the hub
async fn read_loop(
    hub: HubHandle,
    connection_id: ConnectionId,
    identity: Identity,
    liveness: Arc<Liveness>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    while let Some(msg) = ws_stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                return;
            }
        };
        liveness.touch();

        match msg {
            Message::Text(text) => {
                if !handle_text_message(&hub, connection_id, &identity, &text).await {
                    return;
                }
            }
            Message::Binary(_) => {
                tracing::debug!(connection_id = %connection_id, "Binary frame dropped");
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Pong replies are sent by axum
                tracing::trace!(connection_id = %connection_id, "Keepalive frame received");
            }
            Message::Close(_) => {
                tracing::info!(connection_id = %connection_id, "Client closed connection");
                return;
            }
        }
    }
}

/// Returns `false` once the hub is gone
async fn handle_text_message(
    hub: &HubHandle,
    connection_id: ConnectionId,
    identity: &Identity,
    text: &str,
) -> bool {
    match MessageDispatcher::dispatch(identity, text) {
        Ok(request) => hub.inbound(connection_id, request).await.is_ok(),
        Err(e) if e.is_unauthorized() => {
            tracing::warn!(
                connection_id = %connection_id,
                user_id = %identity.user_id,
                code = e.code(),
                error = %e,
                "Unauthorized event dropped"
            );
            true
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                code = e.code(),
                error = %e,
                "Invalid event dropped"
            );
            true
        }
    }
}

/// Drain the outbound queue onto the socket and keep the connection alive
async fn write_loop(
    connection_id: ConnectionId,
    mut rx: mpsc::Receiver<Envelope>,
    mut ws_sink: SplitSink<WebSocket, Message>,
    liveness: Arc<Liveness>,
    keepalive_interval: Duration,
    keepalive_timeout: Duration,
) {
    let mut ping = interval(keepalive_interval.max(MIN_KEEPALIVE_INTERVAL));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else {
                    // Hub dropped the connection (shutdown or prune)
                    let _ = ws_sink.send(close_message(CloseCode::GoingAway)).await;
                    return;
                };

                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "Failed to encode message");
                        continue;
                    }
                };

                if ws_sink.send(Message::Text(json)).await.is_err() {
                    tracing::warn!(connection_id = %connection_id, "Failed to send message to WebSocket");
                    return;
                }
            }
            _ = ping.tick() => {
                let idle = liveness.idle_for();
                if idle > keepalive_timeout {
                    tracing::warn!(
                        connection_id = %connection_id,
                        idle_ms = idle.as_millis() as u64,
                        "Connection timed out (no keepalive)"
                    );
                    let _ = ws_sink.send(close_message(CloseCode::KeepaliveTimeout)).await;
                    return;
                }

                if ws_sink.send(Message::Ping(Vec::new())).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn close_message(code: CloseCode) -> Message {
    Message::Close(Some(CloseFrame {
        code: code.as_u16(),
        reason: Cow::Borrowed(code.description()),
    }))
}
