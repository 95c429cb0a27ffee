//! Client Layer
//!
//! Configuration and the session lifecycle state machine the UI talks to.

pub mod config;
pub mod controller;

pub use config::ClientConfig;
pub use controller::{Phase, SessionController, SessionView, Update};
