//! Game Logic Module
//!
//! ## Module Structure
//!
//! - `local`: Same-device two-player game
//! - `session`: Online session state, reconciled from server snapshots
//! - `dispatch`: Local move validation before anything goes on the wire

pub mod local;
pub mod session;
pub mod dispatch;

// Re-export key types
pub use local::LocalGame;
pub use session::{Outcome, PlayerId, Reconciled, RoomId, Session, SessionError, SessionStore, Snapshot};
pub use dispatch::{prepare_move, MoveRejection};
