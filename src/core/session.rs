use std::collections::HashMap;

use crate::core::connection::{Connection, ConnectionId};
use crate::core::room::RoomManager;
use crate::core::router::{self, Target};
use crate::error::{LiveSocksError, Result};

/// Live connections and the room each one is in
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: RoomManager,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client connection in the lobby
    pub fn register(&mut self, connection: Connection) {
        let id = connection.id.clone();
        self.connections.insert(id.clone(), connection);
        self.rooms.join_default_room(id);
    }

    /// Move a connection to `room_name`; Ok(false) when it was already there
    pub fn join(&mut self, id: &str, room_name: &str) -> Result<bool> {
        if !self.connections.contains_key(id) {
            return Err(LiveSocksError::SessionNotFound(id.to_string()));
        }
        Ok(self.rooms.join_room(id.to_string(), room_name))
    }

    /// Remove a client connection and its room membership
    pub fn unregister(&mut self, id: &str) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        self.rooms.leave_room(id);
        Some(connection)
    }

    pub fn current_room(&self, id: &str) -> Option<&str> {
        self.rooms.client_room(id)
    }

    /// Number of connections in a room
    pub fn room_size(&self, room_name: &str) -> usize {
        self.rooms.member_count(room_name)
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    /// Fan-out targets for one room
    pub fn room_targets(&self, room_name: &str) -> Vec<Target> {
        self.rooms
            .room_members(room_name)
            .iter()
            .filter_map(|id| self.connections.get(id))
            .map(Connection::target)
            .collect()
    }

    /// Fan-out targets across every room, one entry per connection
    pub fn all_targets(&self) -> Vec<Target> {
        let targets = self
            .rooms
            .rooms()
            .flat_map(|room| room.members.iter())
            .filter_map(|id| self.connections.get(id))
            .map(Connection::target)
            .collect();
        router::dedup(targets)
    }

    pub fn target(&self, id: &str) -> Option<Target> {
        self.connections.get(id).map(Connection::target)
    }

    // Get current clients count
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }
}
