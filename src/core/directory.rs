//! Catalog of live broadcasts and their popularity ranking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::BROADCAST_ROOM_PREFIX;

pub type BroadcastId = String;

const LIKE_WEIGHT: f64 = 0.5;
const GIFT_WEIGHT: f64 = 0.2;

/// An active live stream bound to its own room
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub id: BroadcastId,
    pub title: String,
    pub host: String,
    pub room: String,
    pub started_at: DateTime<Utc>,
    pub likes: u64,
    pub gifts: u64,
    seq: u64,
}

/// Ranked directory entry as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastView {
    pub id: BroadcastId,
    pub title: String,
    pub host: String,
    pub room: String,
    pub started_at: DateTime<Utc>,
    pub viewers: usize,
    pub likes: u64,
    pub gifts: u64,
    pub score: f64,
}

/// Popularity score of a broadcast
pub fn score(viewers: usize, likes: u64, gifts: u64) -> f64 {
    viewers as f64 + likes as f64 * LIKE_WEIGHT + gifts as f64 * GIFT_WEIGHT
}

/// Sort descending by (score, viewers, likes); equal entries keep their order
pub fn rank(views: &mut [BroadcastView]) {
    views.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.viewers.cmp(&a.viewers))
            .then_with(|| b.likes.cmp(&a.likes))
    });
}

/// Room name bound to a broadcast id
pub fn room_for(id: &str) -> String {
    format!("{}{}", BROADCAST_ROOM_PREFIX, id)
}

/// Broadcast id encoded in a bound room name
pub fn broadcast_id_for_room(room: &str) -> Option<&str> {
    room.strip_prefix(BROADCAST_ROOM_PREFIX)
        .filter(|id| !id.is_empty())
}

fn generate_id() -> BroadcastId {
    let hex = Uuid::new_v4().simple().to_string();
    format!("b{}", &hex[..10])
}

/// In-memory directory of live broadcasts
#[derive(Debug, Default)]
pub struct BroadcastDirectory {
    broadcasts: HashMap<BroadcastId, Broadcast>,
    next_seq: u64,
}

impl BroadcastDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new broadcast and return it
    pub fn create(&mut self, host: &str, title: &str) -> Broadcast {
        let mut id = generate_id();
        while self.broadcasts.contains_key(&id) {
            id = generate_id();
        }

        let broadcast = Broadcast {
            room: room_for(&id),
            id: id.clone(),
            title: title.to_string(),
            host: host.to_string(),
            started_at: Utc::now(),
            likes: 0,
            gifts: 0,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.broadcasts.insert(id, broadcast.clone());
        broadcast
    }

    /// Add a like; false if the broadcast no longer exists
    pub fn like(&mut self, id: &str) -> bool {
        match self.broadcasts.get_mut(id) {
            Some(broadcast) => {
                broadcast.likes += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a broadcast if `requester` is its host
    pub fn end(&mut self, id: &str, requester: &str) -> bool {
        match self.broadcasts.get(id) {
            Some(broadcast) if broadcast.host == requester => {
                self.broadcasts.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Credit gifts sent into `room` to the broadcast bound to it
    pub fn add_gifts(&mut self, room: &str, count: u32) -> bool {
        let Some(id) = broadcast_id_for_room(room) else {
            return false;
        };

        match self.broadcasts.get_mut(id) {
            Some(broadcast) if broadcast.room == room => {
                broadcast.gifts += u64::from(count);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Broadcast> {
        self.broadcasts.get(id)
    }

    pub fn len(&self) -> usize {
        self.broadcasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty()
    }

    /// Ranked view of all broadcasts; `viewers` reports a room's occupancy
    pub fn snapshot<F>(&self, viewers: F) -> Vec<BroadcastView>
    where
        F: Fn(&str) -> usize,
    {
        let mut live: Vec<&Broadcast> = self.broadcasts.values().collect();
        live.sort_by_key(|broadcast| broadcast.seq);

        let mut views: Vec<BroadcastView> = live
            .into_iter()
            .map(|broadcast| {
                let viewers = viewers(&broadcast.room);
                BroadcastView {
                    id: broadcast.id.clone(),
                    title: broadcast.title.clone(),
                    host: broadcast.host.clone(),
                    room: broadcast.room.clone(),
                    started_at: broadcast.started_at,
                    viewers,
                    likes: broadcast.likes,
                    gifts: broadcast.gifts,
                    score: score(viewers, broadcast.likes, broadcast.gifts),
                }
            })
            .collect();

        rank(&mut views);
        views
    }
}
