//! Connection Manager
//!
//! Owns the single live connection of an online session. Opening is
//! asynchronous: `connect` returns at once in `Connecting`, and liveness
//! flips to `Connected` only when the server assigns our identity.
//! Failures never surface as errors to callers; they show up as a
//! liveness transition to `Disconnected` plus a `Disconnected` event.
//!
//! Every connection gets a generation number. Events carry it, and events
//! from any generation other than the active one are dropped, so nothing
//! from a torn-down connection reaches a newer session.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::config::ClientConfig;
use crate::game::session::PlayerId;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::transport::{Connector, WsConnector};

/// Connection errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Message could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No live connection.
    #[error("Not connected")]
    NotConnected,

    /// Transport already closed.
    #[error("Transport closed")]
    Closed,
}

/// Connection liveness.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Liveness {
    /// No connection.
    #[default]
    Disconnected,
    /// Opening; identity not yet assigned.
    Connecting,
    /// Live, with the identity the server assigned.
    Connected(PlayerId),
}

impl Liveness {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Liveness::Connected(_))
    }

    /// Identity, valid only while connected.
    pub fn identity(&self) -> Option<&PlayerId> {
        match self {
            Liveness::Connected(id) => Some(id),
            _ => None,
        }
    }
}

/// Liveness of the most recently opened connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LivenessState {
    /// Generation the liveness belongs to.
    pub generation: u64,
    /// Liveness.
    pub liveness: Liveness,
}

/// Something that happened on the active connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Server assigned our identity.
    Connected(PlayerId),
    /// Protocol message from the server.
    Message(ServerMessage),
    /// Connection ended without us asking.
    Disconnected {
        /// What happened, if known.
        reason: Option<String>,
    },
}

struct Tagged {
    generation: u64,
    event: ConnectionEvent,
}

/// A connection handle.
#[derive(Debug)]
pub struct Connection {
    generation: u64,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Generation number of this connection.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns at most one connection at a time.
pub struct ConnectionManager {
    url: String,
    shutdown_timeout: Duration,
    connector: Arc<dyn Connector>,
    active: Option<Connection>,
    next_generation: u64,
    liveness: Arc<watch::Sender<LivenessState>>,
    events_tx: mpsc::UnboundedSender<Tagged>,
    events_rx: mpsc::UnboundedReceiver<Tagged>,
}

impl ConnectionManager {
    /// Create a manager that opens transports with `connector`.
    pub fn new(config: &ClientConfig, connector: impl Connector) -> Self {
        let (liveness, _) = watch::channel(LivenessState::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            url: config.server_url.clone(),
            shutdown_timeout: config.shutdown_timeout,
            connector: Arc::new(connector),
            active: None,
            next_generation: 0,
            liveness: Arc::new(liveness),
            events_tx,
            events_rx,
        }
    }

    /// Create a manager that connects over WebSocket.
    pub fn websocket(config: &ClientConfig) -> Self {
        Self::new(config, WsConnector)
    }

    /// Open the connection, or return the one already open or opening.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&mut self) -> &Connection {
        let connection = match self.active.take() {
            Some(existing) if !existing.task.is_finished() => existing,
            _ => self.open(),
        };
        self.active.insert(connection)
    }

    fn open(&mut self) -> Connection {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.liveness.send_replace(LivenessState {
            generation,
            liveness: Liveness::Connecting,
        });

        info!(generation, "Opening connection to {}", self.url);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(
            self.connector.clone(),
            self.url.clone(),
            generation,
            outbound_rx,
            self.events_tx.clone(),
            self.liveness.clone(),
        ));

        Connection {
            generation,
            outbound: outbound_tx,
            task,
        }
    }

    /// Tear the connection down and drop everything it still had queued.
    /// No-op when already disconnected.
    pub fn disconnect(&mut self) {
        let Some(Connection { generation, outbound, mut task }) = self.active.take() else {
            return;
        };
        info!(generation, "Disconnecting");

        // Closing the outbound queue makes the I/O task close the transport.
        drop(outbound);
        match Handle::try_current() {
            Ok(handle) => {
                let timeout = self.shutdown_timeout;
                handle.spawn(async move {
                    if tokio::time::timeout(timeout, &mut task).await.is_err() {
                        warn!(generation, "Connection did not close in {:?}, aborting", timeout);
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }

        publish(&self.liveness, generation, Liveness::Disconnected);

        let mut dropped = 0;
        while self.events_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(generation, dropped, "Discarded queued events");
        }
    }

    /// Current liveness.
    pub fn liveness(&self) -> Liveness {
        self.liveness.borrow().liveness.clone()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.liveness.borrow().liveness.is_connected()
    }

    /// Our identity on the live connection.
    pub fn identity(&self) -> Option<PlayerId> {
        self.liveness.borrow().liveness.identity().cloned()
    }

    /// Generation of the active connection, if any.
    pub fn generation(&self) -> Option<u64> {
        self.active.as_ref().map(Connection::generation)
    }

    /// Watch liveness changes.
    pub fn subscribe_liveness(&self) -> watch::Receiver<LivenessState> {
        self.liveness.subscribe()
    }

    /// Queue a message on the live connection.
    pub fn send(&self, message: ClientMessage) -> Result<(), ConnectionError> {
        let connection = self.active.as_ref().ok_or(ConnectionError::NotConnected)?;
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }

        debug!(generation = connection.generation, "Queueing {}", message.event_name());
        connection
            .outbound
            .send(message)
            .map_err(|_| ConnectionError::Closed)
    }

    /// Wait for the next event on the active connection.
    ///
    /// Events from superseded connections are skipped. A `Disconnected`
    /// event also clears the active connection. Cancel safe.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        while let Some(Tagged { generation, event }) = self.events_rx.recv().await {
            if self.generation() != Some(generation) {
                debug!(generation, "Dropping event from superseded connection");
                continue;
            }

            if let ConnectionEvent::Disconnected { reason } = &event {
                info!(
                    generation,
                    "Connection lost: {}",
                    reason.as_deref().unwrap_or("closed")
                );
                self.active = None;
            }
            return Some(event);
        }
        None
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Set liveness if `generation` is still the latest one.
fn publish(liveness: &watch::Sender<LivenessState>, generation: u64, value: Liveness) {
    liveness.send_if_modified(|state| {
        if state.generation != generation || state.liveness == value {
            return false;
        }
        state.liveness = value;
        true
    });
}

/// I/O loop for one connection.
///
/// Exits when:
/// - The outbound queue closes (we disconnected)
/// - The transport ends or errors (server side)
async fn run_connection(
    connector: Arc<dyn Connector>,
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<Tagged>,
    liveness: Arc<watch::Sender<LivenessState>>,
) {
    let emit = |event: ConnectionEvent| {
        // The manager may already be gone.
        let _ = events.send(Tagged { generation, event });
    };

    let mut transport = match connector.open(&url).await {
        Ok(transport) => transport,
        Err(e) => {
            error!(generation, "Failed to connect to {}: {}", url, e);
            publish(&liveness, generation, Liveness::Disconnected);
            emit(ConnectionEvent::Disconnected { reason: Some(e.to_string()) });
            return;
        }
    };

    let reason = loop {
        tokio::select! {
            cmd = outbound.recv() => {
                match cmd {
                    Some(msg) => match msg.to_json() {
                        Ok(json) => {
                            debug!(generation, "Sending {}", msg.event_name());
                            if let Err(e) = transport.send(json).await {
                                error!(generation, "Failed to send message: {}", e);
                                break Some(format!("send failed: {e}"));
                            }
                        }
                        Err(e) => {
                            error!(generation, "Failed to serialize {}: {}", msg.event_name(), e);
                        }
                    },
                    None => {
                        debug!(generation, "Outbound queue closed, closing transport");
                        if let Err(e) = transport.close().await {
                            debug!(generation, "Close failed: {}", e);
                        }
                        break None;
                    }
                }
            }
            frame = transport.recv() => {
                match frame {
                    Some(Ok(text)) => {
                        #[cfg(feature = "debug-tracing")]
                        tracing::trace!(generation, "Raw frame: {}", text);

                        match ServerMessage::from_json(&text) {
                            Ok(ServerMessage::Connected(info)) => {
                                info!(generation, "Connected as {}", info.id);
                                publish(&liveness, generation, Liveness::Connected(info.id.clone()));
                                emit(ConnectionEvent::Connected(info.id));
                            }
                            Ok(msg) => {
                                debug!(generation, "Received {}", msg.event_name());
                                emit(ConnectionEvent::Message(msg));
                            }
                            Err(e) => {
                                warn!(generation, "Failed to parse server message: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(generation, "WebSocket read error: {}", e);
                        break Some(format!("read failed: {e}"));
                    }
                    None => {
                        info!(generation, "Server closed connection");
                        break Some("server closed connection".to_string());
                    }
                }
            }
        }
    };

    publish(&liveness, generation, Liveness::Disconnected);
    emit(ConnectionEvent::Disconnected { reason });
    debug!(generation, "Connection task ended");
}
