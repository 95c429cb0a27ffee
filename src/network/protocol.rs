//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text envelope `{"event": <name>, "data": <payload>}`
//! with kebab-case event names and camelCase payload fields.

use serde::{Serialize, Deserialize};

use crate::core::board::{Board, Cell};
use crate::game::session::{Outcome, PlayerId, RoomId, Snapshot};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Enter the matchmaking queue.
    FindOpponent {},

    /// Place the local player's mark.
    MakeMove(MoveRequest),
}

/// Move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    /// Room the move is for.
    pub room_id: RoomId,
    /// Cell index, 0-8.
    pub position: usize,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Connection accepted; carries our identity for this connection.
    Connected(ConnectedInfo),

    /// Matchmaking status text. Informational only.
    FindingOpponent(serde_json::Value),

    /// Matchmaking resolved; initial snapshot.
    SessionAssigned(StatePayload),

    /// Board changed after an accepted move.
    StateUpdate(StatePayload),

    /// Final board and winner.
    GameWon(GameWonPayload),
}

/// Identity assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedInfo {
    /// Connection identity.
    pub id: PlayerId,
}

/// Full session state, sent on assignment and after every accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    /// Room identifier.
    pub room_id: RoomId,
    /// Board.
    pub game_state: Board,
    /// Identity of the player to move.
    #[serde(default)]
    pub player_turn: Option<String>,
    /// Winner identity; null or empty while undecided (or drawn).
    #[serde(default)]
    pub winner: Option<String>,
    /// Mark the next move places.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_move: Option<Cell>,
}

impl StatePayload {
    /// Decode into a snapshot.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            room_id: Some(self.room_id),
            outcome: Outcome::from_state(self.winner.as_deref(), &self.game_state),
            board: self.game_state,
            player_turn: self.player_turn.filter(|id| !id.is_empty()).map(PlayerId::new),
            current_move: self.current_move.and_then(Cell::mark),
        }
    }
}

/// Terminal update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameWonPayload {
    /// Final board.
    pub game_state: Board,
    /// Winner identity, or null / `"draw"` for a draw.
    #[serde(default)]
    pub winner: Option<String>,
}

impl GameWonPayload {
    /// Decode into a terminal snapshot. Carries no room, so it applies to
    /// the current session.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            room_id: None,
            board: self.game_state,
            player_turn: None,
            outcome: Outcome::from_final(self.winner.as_deref()),
            current_move: None,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Event name on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::FindOpponent {} => "find-opponent",
            ClientMessage::MakeMove(_) => "make-move",
        }
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Event name on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected(_) => "connected",
            ServerMessage::FindingOpponent(_) => "finding-opponent",
            ServerMessage::SessionAssigned(_) => "session-assigned",
            ServerMessage::StateUpdate(_) => "state-update",
            ServerMessage::GameWon(_) => "game-won",
        }
    }
}
