//! Move Dispatcher
//!
//! Turns a clicked cell into a `make-move` request, after checking locally
//! that the move could possibly be legal. Never touches the board: an
//! accepted move comes back later as a server snapshot.

use thiserror::Error;

use crate::game::session::Session;
use crate::network::protocol::{ClientMessage, MoveRequest};

/// Why a move was not sent.
///
/// Rejections are silent no-ops for the player; the reason exists for
/// logging and tests only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// No active session.
    #[error("no active session")]
    NoSession,

    /// Game is already over.
    #[error("game is finished")]
    GameFinished,

    /// Cell index outside 0..9.
    #[error("cell {0} is off the board")]
    OutOfRange(usize),

    /// Cell already holds a mark in the last known board.
    #[error("cell {0} is occupied")]
    Occupied(usize),

    /// Last known turn belongs to the opponent.
    #[error("not our turn")]
    NotOurTurn,
}

/// Build the move request for `cell`, or say why not.
///
/// Checks, in order: session exists and is in progress, the cell is on
/// the board and empty, and the turn is ours.
pub fn prepare_move(session: Option<&Session>, cell: usize) -> Result<ClientMessage, MoveRejection> {
    let session = session.ok_or(MoveRejection::NoSession)?;

    if session.outcome().is_terminal() {
        return Err(MoveRejection::GameFinished);
    }

    match session.board().get(cell) {
        None => return Err(MoveRejection::OutOfRange(cell)),
        Some(c) if !c.is_empty() => return Err(MoveRejection::Occupied(cell)),
        Some(_) => {}
    }

    if !session.is_my_turn() {
        return Err(MoveRejection::NotOurTurn);
    }

    Ok(ClientMessage::MakeMove(MoveRequest {
        room_id: session.room_id().clone(),
        position: cell,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::{Board, Mark};
    use crate::game::session::{Outcome, PlayerId, RoomId, SessionStore, Snapshot};
    use proptest::prelude::*;

    fn store_with(board: Board, turn: &str, outcome: Outcome) -> SessionStore {
        let mut store = SessionStore::new();
        store
            .init(
                Snapshot {
                    room_id: Some(RoomId::new("room-1")),
                    board,
                    player_turn: Some(PlayerId::new(turn)),
                    outcome,
                    current_move: None,
                },
                PlayerId::new("me"),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_accepts_legal_move() {
        let store = store_with(Board::new(), "me", Outcome::InProgress);
        let msg = prepare_move(store.current(), 4).unwrap();

        match msg {
            ClientMessage::MakeMove(req) => {
                assert_eq!(req.room_id.as_str(), "room-1");
                assert_eq!(req.position, 4);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_without_session() {
        assert_eq!(prepare_move(None, 4).unwrap_err(), MoveRejection::NoSession);
    }

    #[test]
    fn test_rejects_occupied_and_out_of_range() {
        let mut board = Board::new();
        board.place(4, Mark::O).unwrap();
        let store = store_with(board, "me", Outcome::InProgress);

        assert_eq!(prepare_move(store.current(), 4).unwrap_err(), MoveRejection::Occupied(4));
        assert_eq!(prepare_move(store.current(), 9).unwrap_err(), MoveRejection::OutOfRange(9));
    }

    #[test]
    fn test_rejects_finished_game() {
        let store = store_with(Board::new(), "me", Outcome::Won(PlayerId::new("them")));
        assert_eq!(prepare_move(store.current(), 0).unwrap_err(), MoveRejection::GameFinished);
    }

    #[test]
    fn test_does_not_touch_board() {
        let store = store_with(Board::new(), "me", Outcome::InProgress);
        prepare_move(store.current(), 0).unwrap();
        assert_eq!(*store.current().unwrap().board(), Board::new());
    }

    proptest! {
        #[test]
        fn prop_never_moves_on_opponent_turn(cell in 0usize..16, turn in "[a-z]{1,8}") {
            prop_assume!(turn != "me");
            let store = store_with(Board::new(), &turn, Outcome::InProgress);
            prop_assert!(prepare_move(store.current(), cell).is_err());
        }
    }
}
