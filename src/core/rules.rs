//! Rules Engine
//!
//! Decides whether a board is won, drawn, or still in progress.
//! Pure and deterministic: eight fixed comparisons, no I/O.
//!
//! Used directly by the pass-and-play game, and by the session store to
//! cross-check (never to override) outcomes declared by the server.

use serde::{Serialize, Deserialize};

use super::board::{Board, Mark};

/// An index-triple that wins when all three cells hold the same mark.
pub type WinLine = [usize; 3];

/// The eight winning lines, in scan order.
///
/// When a board completes more than one line, the first match in this
/// list is reported.
pub const WINNING_LINES: [WinLine; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Result of evaluating a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// At least one empty cell and no winning line.
    InProgress,
    /// A line is complete.
    Won {
        /// Mark that completed the line.
        mark: Mark,
        /// The line, for highlighting.
        line: WinLine,
    },
    /// Board full with no winning line.
    Draw,
}

impl Verdict {
    /// Check if the game is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::InProgress)
    }

    /// Winning mark, if any.
    pub fn winner(&self) -> Option<Mark> {
        match self {
            Verdict::Won { mark, .. } => Some(*mark),
            _ => None,
        }
    }

    /// Winning line, if any.
    pub fn line(&self) -> Option<WinLine> {
        match self {
            Verdict::Won { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// First completed line on the board, in [`WINNING_LINES`] order.
pub fn winning_line(board: &Board) -> Option<(Mark, WinLine)> {
    let cells = board.cells();
    WINNING_LINES.iter().find_map(|&[a, b, c]| {
        let mark = cells[a].mark()?;
        (cells[a] == cells[b] && cells[a] == cells[c]).then_some((mark, [a, b, c]))
    })
}

/// Evaluate a board.
pub fn evaluate(board: &Board) -> Verdict {
    if let Some((mark, line)) = winning_line(board) {
        return Verdict::Won { mark, line };
    }

    if board.is_full() {
        Verdict::Draw
    } else {
        Verdict::InProgress
    }
}
