//! WebSocket connection management
//! Handles the lifecycle of client connections

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

use crate::core::router::Target;

pub type ConnectionId = String;

/// Represents the state of a single WebSocket connection
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender)
    }

    pub fn with_id(id: ConnectionId, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Fan-out handle for this connection
    pub fn target(&self) -> Target {
        Target {
            id: self.id.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
