//! Rate limiting module to prevent chat flooding

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::connection::ConnectionId;

/// Per-connection cooldown gate for chat and gift events.
///
/// Only successful calls open a new window; a rejected call leaves the
/// previous window untouched.
#[derive(Debug)]
pub struct MessageRateLimiter {
    last_send: HashMap<ConnectionId, Instant>,
    cooldown: Duration,
}

impl MessageRateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_send: HashMap::new(),
            cooldown,
        }
    }

    /// Check if a connection can send another message now
    pub fn allow(&mut self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now())
    }

    /// Check against an explicit clock reading
    pub fn allow_at(&mut self, client_id: &str, now: Instant) -> bool {
        if let Some(last) = self.last_send.get(client_id) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }

        self.last_send.insert(client_id.to_string(), now);
        true
    }

    /// Drop state for a connection that went away
    pub fn forget(&mut self, client_id: &str) {
        self.last_send.remove(client_id);
    }

    /// Get number of tracked connections
    pub fn tracked_count(&self) -> usize {
        self.last_send.len()
    }
}
