//! WebSocket [`Connector`] for the cloud server.

use crate::server::telemetry::{
    decrement_open_connections, increment_connect_attempts, increment_open_connections,
};
use anyhow::Context;
use bytes::Bytes;
use followsync::{Connector, Frame, FrameSink, FrameStream, TransportError};
use futures::{SinkExt, StreamExt, future};
use std::sync::Once;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::USER_AGENT},
    },
};
use url::Url;

static TLS_PROVIDER_ONCE: Once = Once::new();

/// Installs `ring` as the process-wide rustls provider. A provider that is
/// already installed is left alone.
pub fn install_rustls_provider() {
    TLS_PROVIDER_ONCE.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("rustls crypto provider already installed");
        }
    });
}

/// Opens `ws://` or `wss://` connections, sending a `User-Agent` header on
/// the upgrade request since the cloud server rejects clients without one.
#[derive(Clone, Debug)]
pub struct WsConnector {
    url: Url,
    user_agent: HeaderValue,
}

impl WsConnector {
    pub fn new(url: Url, user_agent: &str) -> anyhow::Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .with_context(|| format!("invalid user agent {user_agent:?}"))?;
        install_rustls_provider();
        Ok(Self { url, user_agent })
    }
}

/// Decrements the open-connection gauge when the inbound half is dropped.
struct OpenConnection;

impl OpenConnection {
    fn track() -> Self {
        increment_open_connections();
        Self
    }
}

impl Drop for OpenConnection {
    fn drop(&mut self) {
        decrement_open_connections();
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::text(text),
        Frame::Ping(payload) => Message::Ping(Bytes::from(payload)),
        Frame::Pong(payload) => Message::Pong(Bytes::from(payload)),
        Frame::Close => Message::Close(None),
    }
}

fn to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Ping(payload) => Some(Frame::Ping(payload.to_vec())),
        Message::Pong(payload) => Some(Frame::Pong(payload.to_vec())),
        Message::Close(_) => Some(Frame::Close),
        Message::Binary(_) | Message::Frame(_) => None,
    }
}

fn io_error(e: impl std::fmt::Display) -> TransportError {
    TransportError::Io {
        context: e.to_string(),
    }
}

impl Connector for WsConnector {
    async fn connect(&self) -> Result<(FrameSink, FrameStream), TransportError> {
        increment_connect_attempts();

        let mut request =
            self.url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::Connect {
                    context: e.to_string(),
                })?;
        request
            .headers_mut()
            .insert(USER_AGENT, self.user_agent.clone());

        let (socket, response) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::Connect {
                    context: e.to_string(),
                })?;
        tracing::debug!(url = %self.url, status = %response.status(), "websocket upgraded");

        let (write, read) = socket.split();
        let sink = write
            .sink_map_err(io_error)
            .with(|frame: Frame| future::ready(Ok::<_, TransportError>(to_message(frame))));

        let guard = OpenConnection::track();
        let stream = read.filter_map(move |message| {
            let _open = &guard;
            future::ready(match message {
                Ok(message) => to_frame(message).map(Ok),
                Err(e) => Some(Err(io_error(e))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
