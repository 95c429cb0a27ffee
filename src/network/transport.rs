//! Transport
//!
//! The byte pipe under the protocol: something that carries JSON text
//! frames in order, both ways. Production uses a WebSocket; tests plug in
//! an in-memory pair.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::connection::ConnectionError;

/// An open, ordered, bidirectional text channel.
#[async_trait]
pub trait Transport: Send {
    /// Send one frame.
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError>;

    /// Next frame. `None` once the peer has closed.
    ///
    /// Must be cancel safe: it is raced against outbound traffic.
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>>;

    /// Close gracefully.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `url`.
    async fn open(&self, url: &str) -> Result<Box<dyn Transport>, ConnectionError>;
}

// =============================================================================
// WEBSOCKET
// =============================================================================

/// WebSocket transport.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError> {
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!("Server closed connection: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    debug!("Ignoring {} byte binary frame", data.len());
                }
                // Ping/pong are answered by tungstenite.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Opens [`WsTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn Transport>, ConnectionError> {
        info!("Connecting to {}...", url);
        let (stream, _) = connect_async(url).await?;
        info!("WebSocket connected!");
        Ok(Box::new(WsTransport { stream }))
    }
}
