//! WebSocket test clients and identity fixtures

use std::time::Duration;

use anyhow::{Context, Result};
use formwatch_core::{Identity, UserId};
use formwatch_relay::protocol::{Envelope, EventName};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::helpers::TestRelay;

/// How long a client waits for the next event
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A fresh end user identity
pub fn user() -> Identity {
    Identity::user(UserId::generate())
}

/// A fresh admin identity
pub fn admin() -> Identity {
    Identity::admin(UserId::generate())
}

/// Connected WebSocket client acting as one identity
pub struct TestClient {
    pub identity: Identity,
    stream: WsStream,
}

impl TestClient {
    /// Connect with a bearer token minted for `identity`
    pub async fn connect(relay: &TestRelay, identity: Identity) -> Result<Self> {
        let token = relay.token_for(identity)?;
        let mut request = relay.ws_url().into_client_request()?;
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );

        let (stream, _) = connect_async(request).await?;
        Ok(Self { identity, stream })
    }

    /// Connect passing the token in the query string
    pub async fn connect_with_query(relay: &TestRelay, identity: Identity) -> Result<Self> {
        let token = relay.token_for(identity)?;
        let url = format!("{}?token={token}", relay.ws_url());

        let (stream, _) = connect_async(url).await?;
        Ok(Self { identity, stream })
    }

    /// User id of the client's identity
    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    /// Send an event envelope
    pub async fn send(&mut self, event: EventName, data: Value) -> Result<()> {
        let text = json!({ "event": event, "data": data }).to_string();
        self.send_raw(&text).await
    }

    /// Send an arbitrary text frame
    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// `typing:start` for this client's own user
    pub async fn type_into(&mut self, field: &str, value: &str) -> Result<()> {
        let data = json!({ "userId": self.user_id(), "field": field, "value": value });
        self.send(EventName::TypingStart, data).await
    }

    /// Receive the next event, skipping keepalive frames
    pub async fn recv(&mut self) -> Result<Envelope> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for an event")?
                .context("Connection ended")??;

            match frame {
                Message::Text(text) => return Ok(Envelope::from_json(&text)?),
                Message::Close(frame) => anyhow::bail!("Connection closed: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Receive the next event and check its name
    pub async fn expect(&mut self, event: EventName) -> Result<Envelope> {
        let envelope = self.recv().await?;
        anyhow::ensure!(
            envelope.name() == Some(event),
            "Expected {event}, got {}",
            envelope.event
        );
        Ok(envelope)
    }

    /// Skip events until one named `event` arrives
    pub async fn skip_until(&mut self, event: EventName) -> Result<Envelope> {
        loop {
            let envelope = self.recv().await?;
            if envelope.name() == Some(event) {
                return Ok(envelope);
            }
        }
    }

    /// Receive the next event, check its name and decode its data
    pub async fn expect_data<T: DeserializeOwned>(&mut self, event: EventName) -> Result<T> {
        Ok(self.expect(event).await?.data_as()?)
    }

    /// Check that no event arrives within `window`
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.recv()).await {
            Err(_) => Ok(()),
            Ok(Ok(envelope)) => anyhow::bail!("Unexpected event {}", envelope.event),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Wait for the close frame and return its code
    pub async fn expect_close(&mut self) -> Result<u16> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for close")?
                .context("Connection ended without close frame")??;

            if let Message::Close(frame) = frame {
                let frame = frame.context("Close frame without code")?;
                return Ok(u16::from(frame.code));
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Attempt a handshake and return the HTTP status it was rejected with
pub async fn rejected_status(relay: &TestRelay, token: Option<&str>) -> Result<StatusCode> {
    let mut request = relay.ws_url().into_client_request()?;
    if let Some(token) = token {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }

    match connect_async(request).await {
        Ok(_) => anyhow::bail!("Handshake unexpectedly accepted"),
        Err(WsError::Http(response)) => Ok(response.status()),
        Err(e) => Err(e.into()),
    }
}
