//! Board Definitions
//!
//! The 3x3 grid, row-major:
//!
//! ```text
//!  0 | 1 | 2
//! ---+---+---
//!  3 | 4 | 5
//! ---+---+---
//!  6 | 7 | 8
//! ```
//!
//! On the wire a board is `gameState`, an array of `"X"`, `"O"` or `null`.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of cells on the board.
pub const BOARD_SIZE: usize = 9;

// =============================================================================
// MARK
// =============================================================================

/// A player's mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// Moves first.
    X,
    /// Moves second.
    O,
}

impl Mark {
    /// The other mark.
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Parse a wire mark. Case-insensitive.
    pub fn parse(s: &str) -> Option<Mark> {
        match s {
            "X" | "x" => Some(Mark::X),
            "O" | "o" => Some(Mark::O),
            _ => None,
        }
    }

    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CELL
// =============================================================================

/// Contents of a single board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireCell", into = "WireCell")]
pub enum Cell {
    /// Nothing placed yet.
    #[default]
    Empty,
    /// Holds X.
    X,
    /// Holds O.
    O,
}

impl Cell {
    /// Check if the cell is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// Mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

/// Wire form of a cell: `"X"`, `"O"`, `null` or `""`.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct WireCell(Option<String>);

impl TryFrom<WireCell> for Cell {
    type Error = BoardError;

    fn try_from(wire: WireCell) -> Result<Self, Self::Error> {
        match wire.0.as_deref() {
            None | Some("") => Ok(Cell::Empty),
            Some(s) => Mark::parse(s)
                .map(Cell::from)
                .ok_or_else(|| BoardError::InvalidCell(s.to_string())),
        }
    }
}

impl From<Cell> for WireCell {
    fn from(cell: Cell) -> Self {
        WireCell(cell.mark().map(|m| m.as_str().to_string()))
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// Board errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Cell value is not a mark.
    #[error("Invalid cell value: {0:?}")]
    InvalidCell(String),

    /// Board does not have nine cells.
    #[error("Board must have 9 cells, got {0}")]
    WrongLength(usize),

    /// Index outside 0..9.
    #[error("Cell index out of range: {0}")]
    OutOfRange(usize),

    /// Cell already holds a mark.
    #[error("Cell {0} is already occupied")]
    Occupied(usize),
}

/// Nine cells in row-major order.
///
/// The length is fixed by the type. An empty array on the wire decodes
/// to the empty board; any length other than nine is rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Cell>", into = "Vec<Cell>")]
pub struct Board([Cell; BOARD_SIZE]);

impl Board {
    /// Create an empty board.
    pub const fn new() -> Self {
        Self([Cell::Empty; BOARD_SIZE])
    }

    /// Create from cells.
    pub const fn from_cells(cells: [Cell; BOARD_SIZE]) -> Self {
        Self(cells)
    }

    /// Get a cell. `None` if `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.0.get(index).copied()
    }

    /// All cells.
    pub fn cells(&self) -> &[Cell; BOARD_SIZE] {
        &self.0
    }

    /// Check if the cell at `index` exists and is empty.
    pub fn is_open(&self, index: usize) -> bool {
        self.get(index).is_some_and(Cell::is_empty)
    }

    /// Check if every cell holds a mark.
    pub fn is_full(&self) -> bool {
        self.0.iter().all(|c| !c.is_empty())
    }

    /// Count of empty cells.
    pub fn empty_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_empty()).count()
    }

    /// Place a mark in an empty cell.
    ///
    /// Only the local pass-and-play game mutates boards this way; online
    /// boards are replaced wholesale by server snapshots.
    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), BoardError> {
        let cell = self.0.get_mut(index).ok_or(BoardError::OutOfRange(index))?;
        if !cell.is_empty() {
            return Err(BoardError::Occupied(index));
        }
        *cell = Cell::from(mark);
        Ok(())
    }

    /// Check that `next` keeps every mark already on this board.
    ///
    /// Cells never revert to empty except via a full reset, so a `false`
    /// here means `next` is not a continuation of this board.
    pub fn is_succeeded_by(&self, next: &Board) -> bool {
        self.0
            .iter()
            .zip(next.0.iter())
            .all(|(before, after)| before.is_empty() || before == after)
    }
}

impl TryFrom<Vec<Cell>> for Board {
    type Error = BoardError;

    fn try_from(cells: Vec<Cell>) -> Result<Self, Self::Error> {
        if cells.is_empty() {
            return Ok(Board::new());
        }
        let len = cells.len();
        let cells: [Cell; BOARD_SIZE] = cells
            .try_into()
            .map_err(|_| BoardError::WrongLength(len))?;
        Ok(Board(cells))
    }
}

impl From<Board> for Vec<Cell> {
    fn from(board: Board) -> Self {
        board.0.to_vec()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let cells: Vec<String> = (0..3)
                .map(|col| {
                    let index = row * 3 + col;
                    match self.0[index].mark() {
                        Some(mark) => mark.to_string(),
                        None => index.to_string(),
                    }
                })
                .collect();
            writeln!(f, " {} | {} | {}", cells[0], cells[1], cells[2])?;
        }
        Ok(())
    }
}
