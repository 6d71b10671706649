use std::collections::{HashMap, HashSet};

use crate::constants::LOBBY_ROOM;
use crate::core::connection::ConnectionId;

/// Represents a chat room
#[derive(Debug, Clone)]
pub struct Room {
    /// Room name, unique by string equality
    pub name: String,
    /// Set of connection IDs currently in the room
    pub members: HashSet<ConnectionId>,
    /// Timestamp of room creation
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Room {
    /// Creates a new room with the given name
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: HashSet::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Adds a member to the room
    pub fn add_member(&mut self, client_id: ConnectionId) -> bool {
        self.members.insert(client_id)
    }

    /// Removes a member from the room
    pub fn remove_member(&mut self, client_id: &str) -> bool {
        self.members.remove(client_id)
    }

    /// Checks if a client is a member of the room
    pub fn has_member(&self, client_id: &str) -> bool {
        self.members.contains(client_id)
    }

    /// Returns the number of members in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Tracks which room every connection is in.
///
/// A connection is in at most one room. Rooms come into existence on first
/// join and are dropped as soon as their last member leaves.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Map of room name to room instance
    rooms: HashMap<String, Room>,
    /// Map of client ID to the room it is in
    client_room: HashMap<ConnectionId, String>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a client in the lobby, leaving any previous room
    pub fn join_default_room(&mut self, client_id: ConnectionId) -> bool {
        self.join_room(client_id, LOBBY_ROOM)
    }

    /// Moves a client into `room_name`; false if it was already there
    pub fn join_room(&mut self, client_id: ConnectionId, room_name: &str) -> bool {
        if self.client_room.get(&client_id).map(String::as_str) == Some(room_name) {
            return false;
        }

        self.leave_room(&client_id);

        self.rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Room::new(room_name.to_string()))
            .add_member(client_id.clone());
        self.client_room.insert(client_id, room_name.to_string());

        true
    }

    /// Removes a client from its room, returning the room it left
    pub fn leave_room(&mut self, client_id: &str) -> Option<String> {
        let room_name = self.client_room.remove(client_id)?;

        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.remove_member(client_id);
            if room.is_empty() {
                self.rooms.remove(&room_name);
            }
        }

        Some(room_name)
    }

    /// Gets the room a client is in
    pub fn client_room(&self, client_id: &str) -> Option<&str> {
        self.client_room.get(client_id).map(String::as_str)
    }

    /// Gets all members of a room (empty if the room does not exist)
    pub fn room_members(&self, room_name: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room_name)
            .map(|room| room.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room_name: &str) -> usize {
        self.rooms.get(room_name).map_or(0, Room::member_count)
    }

    /// Iterates over all non-empty rooms
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Lists room names with their occupancy
    pub fn list_rooms(&self) -> Vec<(String, usize)> {
        self.rooms
            .values()
            .map(|room| (room.name.clone(), room.member_count()))
            .collect()
    }
}
