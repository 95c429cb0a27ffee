//! Matchmaking Client
//!
//! Sends `find-opponent` at most once per connection. Assignment itself
//! arrives later as a `session-assigned` message, routed by the controller.
//! There is no client-side timeout: the search lasts until the server
//! answers or the user cancels.

use thiserror::Error;
use tracing::{debug, info};

use crate::network::connection::{ConnectionError, ConnectionManager};
use crate::network::protocol::ClientMessage;

/// Matchmaking errors.
#[derive(Debug, Error)]
pub enum MatchmakingError {
    /// Identity not assigned yet.
    #[error("Not connected")]
    NotConnected,

    /// Request could not be queued.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

/// Tracks whether the current connection already asked for a match.
#[derive(Debug, Default)]
pub struct Matchmaker {
    /// Generation of the connection the request went out on.
    requested_for: Option<u64>,
}

impl Matchmaker {
    /// Create a new matchmaker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the server for an opponent.
    ///
    /// Returns `Ok(true)` if the request was sent, `Ok(false)` if this
    /// connection already has one outstanding.
    pub fn request_match(&mut self, connection: &ConnectionManager) -> Result<bool, MatchmakingError> {
        if !connection.is_connected() {
            return Err(MatchmakingError::NotConnected);
        }
        let generation = connection.generation().ok_or(MatchmakingError::NotConnected)?;

        if self.requested_for == Some(generation) {
            debug!(generation, "Match already requested on this connection");
            return Ok(false);
        }

        connection.send(ClientMessage::FindOpponent {})?;
        self.requested_for = Some(generation);
        info!(generation, "Looking for an opponent");
        Ok(true)
    }

    /// Whether a request is outstanding on `connection`.
    pub fn is_requested(&self, connection: &ConnectionManager) -> bool {
        self.requested_for.is_some() && self.requested_for == connection.generation()
    }

    /// Abort the search. Dropping the connection releases the server-side
    /// queue entry.
    pub fn cancel(&mut self, connection: &mut ConnectionManager) {
        if self.requested_for.is_some() {
            info!("Matchmaking cancelled");
        }
        connection.disconnect();
        self.reset();
    }

    /// Forget the outstanding request (session ended).
    pub fn reset(&mut self) {
        self.requested_for = None;
    }
}
