//! Live Socks - a room-based WebSocket hub for chat, gifts and live broadcasts
//!
//! This library provides the hub (connection registry, room routing, rate
//! limiting and broadcast ranking), its warp endpoints, pluggable chat
//! persistence and a client protocol driver.

pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{LiveSocksError, Result};
