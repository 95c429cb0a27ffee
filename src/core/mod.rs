//! Core game primitives.
//!
//! Pure, deterministic types with no I/O: the board and the rules engine.

pub mod board;
pub mod rules;

// Re-export core types
pub use board::{Board, BoardError, Cell, Mark, BOARD_SIZE};
pub use rules::{evaluate, winning_line, Verdict, WinLine, WINNING_LINES};
