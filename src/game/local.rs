//! Pass-and-Play
//!
//! Two players sharing one device. No network: every click goes straight
//! through the rules engine.

use tracing::debug;

use crate::core::board::{Board, Mark};
use crate::core::rules::{evaluate, Verdict};

/// A same-device game. X always moves first.
#[derive(Debug, Clone)]
pub struct LocalGame {
    board: Board,
    to_move: Mark,
    verdict: Verdict,
}

impl LocalGame {
    /// Start a fresh game.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            to_move: Mark::X,
            verdict: Verdict::InProgress,
        }
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mark that plays next. Frozen once the game is over.
    pub fn to_move(&self) -> Mark {
        self.to_move
    }

    /// Current verdict.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Play the current mark at `index`.
    ///
    /// Returns `false` and leaves the game untouched if the cell is taken,
    /// out of range, or the game is already over.
    pub fn play(&mut self, index: usize) -> bool {
        if self.verdict.is_terminal() {
            return false;
        }
        if let Err(e) = self.board.place(index, self.to_move) {
            debug!("Ignoring local move: {}", e);
            return false;
        }

        self.verdict = evaluate(&self.board);
        if !self.verdict.is_terminal() {
            self.to_move = self.to_move.opponent();
        }
        true
    }

    /// Clear the board for a new game.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for LocalGame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::Cell;

    #[test]
    fn test_turns_alternate() {
        let mut game = LocalGame::new();
        assert_eq!(game.to_move(), Mark::X);

        assert!(game.play(0));
        assert_eq!(game.to_move(), Mark::O);
        assert!(game.play(4));
        assert_eq!(game.to_move(), Mark::X);

        assert_eq!(game.board().get(0), Some(Cell::X));
        assert_eq!(game.board().get(4), Some(Cell::O));
    }

    #[test]
    fn test_occupied_cell_ignored() {
        let mut game = LocalGame::new();
        game.play(0);

        assert!(!game.play(0));
        assert_eq!(game.to_move(), Mark::O);
        assert!(!game.play(42));
    }

    #[test]
    fn test_win_stops_play() {
        let mut game = LocalGame::new();
        for index in [0, 3, 1, 4, 2] {
            assert!(game.play(index));
        }

        assert_eq!(game.verdict(), Verdict::Won { mark: Mark::X, line: [0, 1, 2] });
        assert_eq!(game.to_move(), Mark::X);
        assert!(!game.play(8));
    }

    #[test]
    fn test_draw() {
        let mut game = LocalGame::new();
        // X O X / X O O / O X X
        for index in [0, 1, 2, 4, 3, 5, 7, 6, 8] {
            assert!(game.play(index));
        }

        assert_eq!(game.verdict(), Verdict::Draw);
    }

    #[test]
    fn test_reset() {
        let mut game = LocalGame::new();
        game.play(4);
        game.play(0);
        game.reset();

        assert_eq!(*game.board(), Board::new());
        assert_eq!(game.to_move(), Mark::X);
        assert_eq!(game.verdict(), Verdict::InProgress);
    }
}
