//! Core functionality for the live chat hub

pub mod connection;
pub mod directory;
pub mod message;
pub mod message_handler;
pub mod rate_limiter;
pub mod room;
pub mod router;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use connection::{Connection, ConnectionId};
pub use directory::{Broadcast, BroadcastDirectory, BroadcastView};
pub use message::{ChatMessage, Event, GiftMessage};
pub use message_handler::MessageHandler;
pub use rate_limiter::MessageRateLimiter;
pub use room::{Room, RoomManager};
pub use server::{ServerManager, SharedServerManager};
pub use session::ConnectionRegistry;
