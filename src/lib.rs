//! # Tic-Tac-Toe Online Client
//!
//! Match synchronization client for two-player tic-tac-toe against an
//! authoritative game server, plus a same-device mode.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TIC-TAC-TOE ONLINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Pure primitives                         │
//! │  ├── board.rs      - Cells, marks, 9-cell board              │
//! │  └── rules.rs      - Winning lines, win/draw evaluation      │
//! │                                                              │
//! │  game/             - Game logic                              │
//! │  ├── local.rs      - Pass-and-play game                      │
//! │  ├── session.rs    - Session state store (reconciliation)    │
//! │  └── dispatch.rs   - Move validation before sending          │
//! │                                                              │
//! │  network/          - Networking (non-deterministic)          │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── transport.rs  - WebSocket transport                     │
//! │  ├── connection.rs - Connection lifetime and liveness        │
//! │  └── matchmaking.rs- Opponent search                         │
//! │                                                              │
//! │  client/           - Session lifecycle                       │
//! │  ├── config.rs     - Client configuration                    │
//! │  └── controller.rs - Idle/Searching/Active/Finished machine  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Server Authority
//!
//! In online mode the client never computes the next board:
//! - Moves are validated locally, then sent as requests
//! - The board only changes when a server snapshot arrives
//! - Snapshots replace the session wholesale, in arrival order
//!
//! The rules engine still runs on every snapshot, but only to highlight
//! the winning line and to log disagreements.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod client;

// Re-export commonly used types
pub use core::board::{Board, Cell, Mark};
pub use core::rules::{evaluate, Verdict};
pub use game::local::LocalGame;
pub use game::session::{Outcome, PlayerId, RoomId, Session};
pub use network::connection::{ConnectionManager, Liveness};
pub use client::config::ClientConfig;
pub use client::controller::{Phase, SessionController, SessionView, Update};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
