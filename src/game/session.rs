//! Session State Store
//!
//! Holds the one active online session. The server is the single source of
//! truth: the store never computes a next board, it only swaps in whole
//! snapshots as they arrive, in arrival order.

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::board::{Board, Mark};
use crate::core::rules::{evaluate, winning_line, Verdict, WinLine};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Server-assigned connection identity of a player.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create from the server's identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-issued room identifier. Opaque, unique per match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Create from the server's room string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Wire marker some servers send in `winner` for a drawn game.
pub const DRAW_MARKER: &str = "draw";

/// Outcome of an online session.
///
/// Terminal once `Won` or `Draw`; never goes back to `InProgress`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Game still running.
    InProgress,
    /// Won by the player with this identity.
    Won(PlayerId),
    /// Board full, nobody won.
    Draw,
}

impl Outcome {
    /// Decode the `winner` field of a state snapshot.
    ///
    /// A missing or empty winner is ambiguous on the wire: it means a draw
    /// on a full board and a running game otherwise. The draw marker is
    /// always a draw.
    pub fn from_state(winner: Option<&str>, board: &Board) -> Self {
        match winner {
            Some(DRAW_MARKER) => Outcome::Draw,
            Some(id) if !id.is_empty() => Outcome::Won(PlayerId::new(id)),
            _ if board.is_full() => Outcome::Draw,
            _ => Outcome::InProgress,
        }
    }

    /// Decode the `winner` field of a terminal `game-won` message.
    pub fn from_final(winner: Option<&str>) -> Self {
        match winner {
            Some(id) if !id.is_empty() && id != DRAW_MARKER => Outcome::Won(PlayerId::new(id)),
            _ => Outcome::Draw,
        }
    }

    /// Check if the game is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }

    /// Winner identity, if any.
    pub fn winner(&self) -> Option<&PlayerId> {
        match self {
            Outcome::Won(id) => Some(id),
            _ => None,
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete server view of a session at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Room this snapshot belongs to. `None` for messages that carry no
    /// room, which then apply to whatever session is current.
    pub room_id: Option<RoomId>,
    /// Board.
    pub board: Board,
    /// Identity of the player to move.
    pub player_turn: Option<PlayerId>,
    /// Decoded outcome.
    pub outcome: Outcome,
    /// Mark the next move will place, when the server says.
    pub current_move: Option<Mark>,
}

// =============================================================================
// SESSION
// =============================================================================

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Initial snapshot did not name a room.
    #[error("Session snapshot has no room id")]
    MissingRoomId,
}

/// The active online match, as last reported by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    room_id: RoomId,
    board: Board,
    player_turn: Option<PlayerId>,
    outcome: Outcome,
    current_move: Option<Mark>,
    winning_line: Option<WinLine>,
    local_identity: PlayerId,
    assigned_at: DateTime<Utc>,
}

impl Session {
    /// Room identifier.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Last known board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Identity of the player to move.
    pub fn player_turn(&self) -> Option<&PlayerId> {
        self.player_turn.as_ref()
    }

    /// Last known outcome.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Mark the next move will place, if the server said.
    pub fn current_move(&self) -> Option<Mark> {
        self.current_move
    }

    /// Completed line on the board when the game was won.
    pub fn winning_line(&self) -> Option<WinLine> {
        self.winning_line
    }

    /// This client's own connection identity.
    pub fn local_identity(&self) -> &PlayerId {
        &self.local_identity
    }

    /// When matchmaking assigned this session.
    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    /// Check if the local player is the one to move.
    pub fn is_my_turn(&self) -> bool {
        self.player_turn.as_ref() == Some(&self.local_identity)
    }

    /// `Some(true)` if we won, `Some(false)` if the opponent won,
    /// `None` while in progress or on a draw.
    pub fn did_i_win(&self) -> Option<bool> {
        self.outcome.winner().map(|w| *w == self.local_identity)
    }

    fn apply(&mut self, snapshot: Snapshot) {
        if !self.board.is_succeeded_by(&snapshot.board) {
            warn!("Room {} snapshot reverts placed marks; applying anyway", self.room_id);
        }

        self.board = snapshot.board;
        self.player_turn = snapshot.player_turn;
        self.outcome = snapshot.outcome;
        self.current_move = snapshot.current_move;
        self.winning_line = match self.outcome {
            Outcome::Won(_) => winning_line(&self.board).map(|(_, line)| line),
            _ => None,
        };

        self.cross_check();
    }

    /// Compare the server's outcome with the local rules engine.
    ///
    /// The server result stands either way; disagreement is only logged.
    fn cross_check(&self) {
        let verdict = evaluate(&self.board);
        let agrees = matches!(
            (&self.outcome, verdict),
            (Outcome::InProgress, Verdict::InProgress)
                | (Outcome::Won(_), Verdict::Won { .. })
                | (Outcome::Draw, Verdict::Draw)
        );
        if !agrees {
            warn!(
                "Room {} outcome {:?} disagrees with board verdict {:?}",
                self.room_id, self.outcome, verdict
            );
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// What `reconcile` did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Snapshot replaced the session state.
    Applied,
    /// No session to apply to.
    NoSession,
    /// Snapshot belongs to a different room.
    ForeignRoom,
    /// Session already finished and the snapshot is not terminal.
    AlreadyFinished,
}

/// Single mutable cell holding the current session.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<Session>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Start a session from the matchmaking snapshot, replacing any
    /// previous one.
    pub fn init(
        &mut self,
        snapshot: Snapshot,
        local_identity: PlayerId,
    ) -> Result<&Session, SessionError> {
        let room_id = snapshot.room_id.clone().ok_or(SessionError::MissingRoomId)?;
        info!("Session assigned: room {} (local player {})", room_id, local_identity);

        let mut session = Session {
            room_id,
            board: Board::new(),
            player_turn: None,
            outcome: Outcome::InProgress,
            current_move: None,
            winning_line: None,
            local_identity,
            assigned_at: Utc::now(),
        };
        session.apply(snapshot);

        Ok(self.current.insert(session))
    }

    /// Replace board, turn and outcome with the snapshot.
    ///
    /// Same snapshot twice gives the same session as once. Snapshots for
    /// another room are ignored.
    pub fn reconcile(&mut self, snapshot: Snapshot) -> Reconciled {
        let Some(session) = self.current.as_mut() else {
            debug!("No session; dropping snapshot");
            return Reconciled::NoSession;
        };

        if let Some(room_id) = &snapshot.room_id {
            if *room_id != session.room_id {
                warn!("Ignoring snapshot for room {} (current room {})", room_id, session.room_id);
                return Reconciled::ForeignRoom;
            }
        }

        if session.outcome.is_terminal() && !snapshot.outcome.is_terminal() {
            debug!("Room {} already finished; dropping non-terminal snapshot", session.room_id);
            return Reconciled::AlreadyFinished;
        }

        session.apply(snapshot);
        debug!(
            "Room {} reconciled: turn {:?}, outcome {:?}",
            session.room_id, session.player_turn, session.outcome
        );
        Reconciled::Applied
    }

    /// Current session, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Discard the session.
    pub fn clear(&mut self) -> Option<Session> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::Cell;
    use proptest::prelude::*;

    fn me() -> PlayerId {
        PlayerId::new("me")
    }

    fn them() -> PlayerId {
        PlayerId::new("them")
    }

    fn snapshot(room: &str, board: Board, turn: &PlayerId) -> Snapshot {
        Snapshot {
            room_id: Some(RoomId::new(room)),
            outcome: Outcome::from_state(None, &board),
            board,
            player_turn: Some(turn.clone()),
            current_move: None,
        }
    }

    fn board_with(moves: &[(usize, Mark)]) -> Board {
        let mut board = Board::new();
        for &(index, mark) in moves {
            board.place(index, mark).unwrap();
        }
        board
    }

    #[test]
    fn test_outcome_from_state() {
        let empty = Board::new();
        let full = board_with(&[
            (0, Mark::X), (1, Mark::O), (2, Mark::X),
            (3, Mark::X), (4, Mark::O), (5, Mark::O),
            (6, Mark::O), (7, Mark::X), (8, Mark::X),
        ]);

        assert_eq!(Outcome::from_state(Some("abc"), &empty), Outcome::Won(PlayerId::new("abc")));
        assert_eq!(Outcome::from_state(None, &empty), Outcome::InProgress);
        assert_eq!(Outcome::from_state(Some(""), &empty), Outcome::InProgress);
        assert_eq!(Outcome::from_state(None, &full), Outcome::Draw);
        assert_eq!(Outcome::from_state(Some(""), &full), Outcome::Draw);
        assert_eq!(Outcome::from_state(Some(DRAW_MARKER), &full), Outcome::Draw);
        assert_eq!(Outcome::from_state(Some(DRAW_MARKER), &empty), Outcome::Draw);
    }

    #[test]
    fn test_outcome_from_final() {
        assert_eq!(Outcome::from_final(Some("abc")), Outcome::Won(PlayerId::new("abc")));
        assert_eq!(Outcome::from_final(None), Outcome::Draw);
        assert_eq!(Outcome::from_final(Some("")), Outcome::Draw);
        assert_eq!(Outcome::from_final(Some(DRAW_MARKER)), Outcome::Draw);
    }

    #[test]
    fn test_init() {
        let mut store = SessionStore::new();
        let session = store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        assert_eq!(session.room_id().as_str(), "room-1");
        assert!(session.is_my_turn());
        assert_eq!(*session.outcome(), Outcome::InProgress);
        assert!(store.current().is_some());
    }

    #[test]
    fn test_init_requires_room() {
        let mut store = SessionStore::new();
        let mut snap = snapshot("room-1", Board::new(), &me());
        snap.room_id = None;

        assert_eq!(store.init(snap, me()).unwrap_err(), SessionError::MissingRoomId);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_reconcile_replaces_state() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        let board = board_with(&[(4, Mark::X)]);
        assert_eq!(store.reconcile(snapshot("room-1", board, &them())), Reconciled::Applied);

        let session = store.current().unwrap();
        assert_eq!(session.board().get(4), Some(Cell::X));
        assert!(!session.is_my_turn());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        let snap = snapshot("room-1", board_with(&[(0, Mark::X), (4, Mark::O)]), &me());
        store.reconcile(snap.clone());
        let once = store.current().cloned();
        store.reconcile(snap);

        assert_eq!(store.current().cloned(), once);
    }

    #[test]
    fn test_reconcile_ignores_foreign_room() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        let result = store.reconcile(snapshot("room-2", board_with(&[(0, Mark::O)]), &them()));

        assert_eq!(result, Reconciled::ForeignRoom);
        assert_eq!(*store.current().unwrap().board(), Board::new());
    }

    #[test]
    fn test_reconcile_without_session() {
        let mut store = SessionStore::new();
        assert_eq!(
            store.reconcile(snapshot("room-1", Board::new(), &me())),
            Reconciled::NoSession
        );
    }

    #[test]
    fn test_terminal_outcome_is_sticky() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        let won = board_with(&[(0, Mark::X), (3, Mark::O), (1, Mark::X), (4, Mark::O), (2, Mark::X)]);
        store.reconcile(Snapshot {
            room_id: None,
            board: won,
            player_turn: None,
            outcome: Outcome::Won(me()),
            current_move: None,
        });

        let session = store.current().unwrap();
        assert_eq!(session.did_i_win(), Some(true));
        assert_eq!(session.winning_line(), Some([0, 1, 2]));

        let result = store.reconcile(snapshot("room-1", won, &them()));
        assert_eq!(result, Reconciled::AlreadyFinished);
        assert!(store.current().unwrap().outcome().is_terminal());
    }

    #[test]
    fn test_opponent_win() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        store.reconcile(Snapshot {
            room_id: None,
            board: board_with(&[(2, Mark::O), (4, Mark::O), (6, Mark::O)]),
            player_turn: None,
            outcome: Outcome::from_final(Some("them")),
            current_move: None,
        });

        assert_eq!(store.current().unwrap().did_i_win(), Some(false));
    }

    #[test]
    fn test_clear() {
        let mut store = SessionStore::new();
        store.init(snapshot("room-1", Board::new(), &me()), me()).unwrap();

        assert!(store.clear().is_some());
        assert!(store.current().is_none());
        assert!(store.clear().is_none());
    }

    fn any_board() -> impl Strategy<Value = Board> {
        prop::array::uniform9(prop_oneof![Just(Cell::Empty), Just(Cell::X), Just(Cell::O)])
            .prop_map(Board::from_cells)
    }

    fn any_outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::InProgress),
            Just(Outcome::Draw),
            prop_oneof![Just("me"), Just("them")].prop_map(|id| Outcome::Won(PlayerId::new(id))),
        ]
    }

    proptest! {
        #[test]
        fn prop_reconcile_is_idempotent(
            start in any_board(),
            board in any_board(),
            turn in proptest::option::of(prop_oneof![Just("me"), Just("them")]),
            outcome in any_outcome(),
            room_less in any::<bool>(),
        ) {
            let mut store = SessionStore::new();
            store.init(snapshot("room-1", start, &me()), me()).unwrap();

            let snap = Snapshot {
                room_id: if room_less { None } else { Some(RoomId::new("room-1")) },
                board,
                player_turn: turn.map(PlayerId::new),
                outcome,
                current_move: None,
            };

            let first = store.reconcile(snap.clone());
            let once = store.current().cloned();
            store.reconcile(snap);

            prop_assert_eq!(store.current().cloned(), once);
            if first == Reconciled::Applied {
                prop_assert_eq!(store.current().map(|s| *s.board()), Some(board));
            }
        }
    }
}
