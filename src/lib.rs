//! Rusty Rooms - realtime room coordination over WebSocket
//!
//! A lobby every client lands in plus admin-managed game rooms, with
//! per-room broadcast and an authenticated HTTP surface for room
//! administration.

pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use app::App;
pub use config::*;
pub use constants::*;
pub use error::{Result, RustyRoomsError};
