//! Network Layer
//!
//! WebSocket client for the game server.
//! This layer is **non-deterministic** - game state only changes through `game/`.

pub mod protocol;
pub mod transport;
pub mod connection;
pub mod matchmaking;

#[cfg(test)]
pub(crate) mod testing;

pub use protocol::{
    ClientMessage, ServerMessage, MoveRequest, ConnectedInfo,
    StatePayload, GameWonPayload,
};
pub use transport::{Connector, Transport, WsConnector, WsTransport};
pub use connection::{
    Connection, ConnectionError, ConnectionEvent, ConnectionManager, Liveness, LivenessState,
};
pub use matchmaking::{Matchmaker, MatchmakingError};
