//! Session Lifecycle Controller
//!
//! The state machine that owns the connection, the matchmaker and the
//! session store:
//!
//! ```text
//!   Idle ──find_match──▶ Searching ──session-assigned──▶ Active ──terminal──▶ Finished
//!    ▲                       │                              │                    │
//!    └───────────── leave / cancel_search / connection lost ┴────────────────────┘
//! ```
//!
//! It is the only caller of `connect`/`disconnect` and of matchmaking.
//! The UI reads [`SessionView`] and feeds intents back in.

use tracing::{debug, info, warn};

use crate::core::board::Board;
use crate::core::rules::WinLine;
use crate::game::dispatch::prepare_move;
use crate::game::session::{Outcome, PlayerId, Reconciled, RoomId, Session, SessionStore, Snapshot};
use crate::network::connection::{ConnectionEvent, ConnectionManager, Liveness};
use crate::network::matchmaking::Matchmaker;
use crate::network::protocol::ServerMessage;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// In the menu; no connection.
    #[default]
    Idle,
    /// Waiting for an opponent.
    Searching,
    /// Game in progress.
    Active,
    /// Game decided; board stays visible until the player leaves.
    Finished,
}

/// What an inbound event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Server assigned our identity.
    Connected(PlayerId),
    /// Matchmaking status from the server.
    Matchmaking(String),
    /// Opponent found; session created.
    SessionStarted,
    /// Session reconciled with a new snapshot.
    SessionUpdated,
    /// Session reached a terminal outcome.
    GameOver(Outcome),
    /// Connection dropped; back to idle.
    ConnectionLost(Option<String>),
    /// Nothing changed.
    Ignored,
}

/// Read-only state for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Connection liveness.
    pub liveness: Liveness,
    /// Whether the last session ended because the connection dropped.
    pub connection_lost: bool,
    /// Current room.
    pub room_id: Option<RoomId>,
    /// Last known board (empty without a session).
    pub board: Board,
    /// Whether the local player may move.
    pub my_turn: bool,
    /// Session outcome.
    pub outcome: Option<Outcome>,
    /// `Some(true)` if we won, `Some(false)` if we lost; `None` otherwise.
    pub did_i_win: Option<bool>,
    /// Line to highlight.
    pub winning_line: Option<WinLine>,
}

/// Drives one online session at a time.
pub struct SessionController {
    phase: Phase,
    connection: ConnectionManager,
    matchmaker: Matchmaker,
    store: SessionStore,
    connection_lost: bool,
}

impl SessionController {
    /// Create a controller around an unopened connection manager.
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            phase: Phase::Idle,
            connection,
            matchmaker: Matchmaker::new(),
            store: SessionStore::new(),
            connection_lost: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current session.
    pub fn session(&self) -> Option<&Session> {
        self.store.current()
    }

    /// Connection liveness.
    pub fn liveness(&self) -> Liveness {
        self.connection.liveness()
    }

    /// Snapshot for the renderer.
    pub fn view(&self) -> SessionView {
        let session = self.store.current();
        SessionView {
            phase: self.phase,
            liveness: self.connection.liveness(),
            connection_lost: self.connection_lost,
            room_id: session.map(|s| s.room_id().clone()),
            board: session.map(|s| *s.board()).unwrap_or_default(),
            my_turn: self.phase == Phase::Active && session.is_some_and(Session::is_my_turn),
            outcome: session.map(|s| s.outcome().clone()),
            did_i_win: session.and_then(Session::did_i_win),
            winning_line: session.and_then(Session::winning_line),
        }
    }

    /// Start looking for an online match. Only valid from `Idle`.
    pub fn find_match(&mut self) -> bool {
        if self.phase != Phase::Idle {
            debug!("Ignoring find_match in {:?}", self.phase);
            return false;
        }

        self.connection_lost = false;
        self.connection.connect();
        self.set_phase(Phase::Searching);

        // Identity arrives asynchronously; the request goes out on `Connected`.
        if self.connection.is_connected() {
            self.request_match();
        }
        true
    }

    /// Abort matchmaking.
    pub fn cancel_search(&mut self) -> bool {
        if self.phase != Phase::Searching {
            return false;
        }
        self.matchmaker.cancel(&mut self.connection);
        self.set_phase(Phase::Idle);
        true
    }

    /// Return to the menu from any phase: disconnect and drop the session.
    pub fn leave(&mut self) {
        self.matchmaker.reset();
        self.connection.disconnect();
        if let Some(session) = self.store.clear() {
            info!("Left room {}", session.room_id());
        }
        self.set_phase(Phase::Idle);
    }

    /// Try to play `cell`. Returns whether a move request was sent.
    ///
    /// Rejected moves are silent; the board only changes when the server
    /// confirms.
    pub fn submit_move(&mut self, cell: usize) -> bool {
        if self.phase != Phase::Active {
            debug!("Ignoring move {} in {:?}", cell, self.phase);
            return false;
        }

        match prepare_move(self.store.current(), cell) {
            Ok(message) => match self.connection.send(message) {
                Ok(()) => {
                    debug!("Move {} sent", cell);
                    true
                }
                Err(e) => {
                    warn!("Move {} not sent: {}", cell, e);
                    false
                }
            },
            Err(rejection) => {
                debug!("Move {} rejected: {}", cell, rejection);
                false
            }
        }
    }

    /// Wait for the next connection event and apply it. Cancel safe.
    pub async fn next_update(&mut self) -> Option<Update> {
        let event = self.connection.next_event().await?;
        Some(self.handle_event(event))
    }

    /// Apply one connection event.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Update {
        match event {
            ConnectionEvent::Connected(identity) => {
                if self.phase == Phase::Searching {
                    self.request_match();
                }
                Update::Connected(identity)
            }
            ConnectionEvent::Message(message) => self.handle_message(message),
            ConnectionEvent::Disconnected { reason } => {
                warn!("Connection lost in {:?}", self.phase);
                self.matchmaker.reset();
                self.store.clear();
                self.connection_lost = true;
                self.set_phase(Phase::Idle);
                Update::ConnectionLost(reason)
            }
        }
    }

    fn handle_message(&mut self, message: ServerMessage) -> Update {
        match message {
            ServerMessage::Connected(_) => Update::Ignored,

            ServerMessage::FindingOpponent(status) => {
                let text = status
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string());
                info!("Matchmaking: {}", text);
                Update::Matchmaking(text)
            }

            ServerMessage::SessionAssigned(payload) => {
                if self.phase != Phase::Searching {
                    warn!("Unexpected session assignment in {:?}", self.phase);
                    return Update::Ignored;
                }
                let Some(identity) = self.connection.identity() else {
                    warn!("Session assigned before identity; ignoring");
                    return Update::Ignored;
                };

                match self.store.init(payload.into_snapshot(), identity) {
                    Ok(session) => {
                        let next = if session.outcome().is_terminal() {
                            Phase::Finished
                        } else {
                            Phase::Active
                        };
                        self.set_phase(next);
                        Update::SessionStarted
                    }
                    Err(e) => {
                        warn!("Bad session assignment: {}", e);
                        Update::Ignored
                    }
                }
            }

            ServerMessage::StateUpdate(payload) => self.reconcile(payload.into_snapshot()),
            ServerMessage::GameWon(payload) => self.reconcile(payload.into_snapshot()),
        }
    }

    fn reconcile(&mut self, snapshot: Snapshot) -> Update {
        if !matches!(self.phase, Phase::Active | Phase::Finished) {
            debug!("Dropping snapshot in {:?}", self.phase);
            return Update::Ignored;
        }

        match self.store.reconcile(snapshot) {
            Reconciled::Applied => {}
            _ => return Update::Ignored,
        }

        let outcome = self.store.current().map(|s| s.outcome().clone());
        match outcome {
            Some(outcome) if outcome.is_terminal() => {
                if self.phase != Phase::Finished {
                    info!("Game over: {:?}", outcome);
                    self.set_phase(Phase::Finished);
                }
                Update::GameOver(outcome)
            }
            _ => Update::SessionUpdated,
        }
    }

    fn request_match(&mut self) {
        if let Err(e) = self.matchmaker.request_match(&self.connection) {
            warn!("Matchmaking request failed: {}", e);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            info!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}
