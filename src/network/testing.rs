//! In-memory transport for tests.
//!
//! `mock_pair` gives a connector for the client side and a `MockServer`
//! that receives one `MockLink` per opened connection. Dropping a link's
//! sending half (or calling `hang_up`) looks like the server going away.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::connection::{ConnectionError, ConnectionEvent, ConnectionManager};
use super::protocol::{ClientMessage, ServerMessage};
use super::transport::{Connector, Transport};

pub const WAIT: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_millis(20);

pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError> {
        self.outgoing.send(frame).map_err(|_| ConnectionError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockConnector {
    links: mpsc::UnboundedSender<MockLink>,
    refuse: bool,
}

impl MockConnector {
    /// Connector whose every open attempt fails.
    pub fn refusing(self) -> Self {
        Self { refuse: true, ..self }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, _url: &str) -> Result<Box<dyn Transport>, ConnectionError> {
        if self.refuse {
            return Err(ConnectionError::Closed);
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        self.links
            .send(MockLink {
                to_client: Some(to_client),
                from_client,
                closed: closed.clone(),
            })
            .map_err(|_| ConnectionError::Closed)?;

        Ok(Box::new(MockTransport { incoming, outgoing, closed }))
    }
}

pub struct MockServer {
    links: mpsc::UnboundedReceiver<MockLink>,
}

impl MockServer {
    /// Wait for the client to open a connection.
    pub async fn accept(&mut self) -> MockLink {
        tokio::time::timeout(WAIT, self.links.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    /// True if no further connection gets opened.
    pub async fn no_more_connections(&mut self) -> bool {
        tokio::time::sleep(SETTLE).await;
        self.links.try_recv().is_err()
    }
}

/// Server end of one connection.
pub struct MockLink {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockLink {
    pub fn push(&self, msg: &ServerMessage) {
        self.push_raw(&msg.to_json().unwrap());
    }

    /// Send a raw frame. Ignored if the client is gone.
    pub fn push_raw(&self, frame: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(frame.to_string());
        }
    }

    /// Next client message; `None` on hang-up or timeout.
    pub async fn next_client_message(&mut self) -> Option<ClientMessage> {
        let frame = tokio::time::timeout(WAIT, self.from_client.recv()).await.ok()??;
        Some(ClientMessage::from_json(&frame).unwrap())
    }

    /// Let pending work run, then report what the client sent.
    pub async fn drain_client_messages(&mut self) -> Vec<ClientMessage> {
        tokio::time::sleep(SETTLE).await;
        let mut out = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            out.push(ClientMessage::from_json(&frame).unwrap());
        }
        out
    }

    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn mock_pair() -> (MockConnector, MockServer) {
    let (links_tx, links_rx) = mpsc::unbounded_channel();
    (
        MockConnector { links: links_tx, refuse: false },
        MockServer { links: links_rx },
    )
}

/// Next connection event, failing the test after a timeout.
pub async fn next_event(manager: &mut ConnectionManager) -> ConnectionEvent {
    tokio::time::timeout(WAIT, manager.next_event())
        .await
        .expect("timed out waiting for connection event")
        .expect("event channel closed")
}
