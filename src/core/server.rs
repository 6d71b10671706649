//! Integrated server service that coordinates connections, rooms and broadcasts
//!
//! All mutable state lives in one [`HubState`] behind a single mutex.
//! Fan-out targets are resolved while the lock is held and delivered after
//! it is released, so a slow client never blocks registry mutations.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::core::connection::{Connection, ConnectionId};
use crate::core::directory::{Broadcast, BroadcastDirectory, BroadcastView};
use crate::core::message::Event;
use crate::core::rate_limiter::MessageRateLimiter;
use crate::core::router::{self, Target};
use crate::core::session::ConnectionRegistry;
use crate::error::Result;
use crate::storage::persistence::PersistenceQueue;
use crate::storage::traits::{ChatRecord, MessageSink};

/// Registry, limiter and directory guarded together
#[derive(Debug)]
pub struct HubState {
    pub registry: ConnectionRegistry,
    pub limiter: MessageRateLimiter,
    pub directory: BroadcastDirectory,
}

impl HubState {
    pub fn new(chat_cooldown: Duration) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            limiter: MessageRateLimiter::new(chat_cooldown),
            directory: BroadcastDirectory::new(),
        }
    }

    /// Ranked directory with live viewer counts
    pub fn snapshot(&self) -> Vec<BroadcastView> {
        self.directory
            .snapshot(|room| self.registry.room_size(room))
    }

    /// Remove a connection and its throttle state
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        self.limiter.forget(id);
        self.registry.unregister(id)
    }

    /// Directory snapshot addressed to every connection
    fn directory_delivery(&self) -> Result<(Vec<Target>, String)> {
        let frame = Event::broadcast_list(self.snapshot()).to_frame()?;
        Ok((self.registry.all_targets(), frame))
    }
}

/// Integrated server service shared by every connection handler
pub struct ServerManager {
    state: Mutex<HubState>,
    persistence: PersistenceQueue,
    config: ServerConfig,
}

impl ServerManager {
    /// Create a hub persisting into `sink`; must run inside a tokio runtime
    pub fn new(config: ServerConfig, sink: Arc<dyn MessageSink>) -> Self {
        let persistence = PersistenceQueue::start(sink, config.persist_queue_capacity);
        Self {
            state: Mutex::new(HubState::new(config.chat_cooldown)),
            persistence,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register a connection in the lobby and push it the current directory
    pub async fn register(&self, connection: Connection) -> Result<()> {
        let id = connection.id.clone();
        let delivery = {
            let mut state = self.state.lock().await;
            state.registry.register(connection);
            log::info!("Current connections: {}", state.registry.client_count());

            let frame = Event::broadcast_list(state.snapshot()).to_frame()?;
            state.registry.target(&id).map(|target| (vec![target], frame))
        };

        if let Some((targets, frame)) = delivery {
            self.deliver(targets, frame).await;
        }
        Ok(())
    }

    /// Move a connection to another room; refreshes the directory on change
    pub async fn join_room(&self, id: &str, room_name: &str) -> Result<bool> {
        let delivery = {
            let mut state = self.state.lock().await;
            if !state.registry.join(id, room_name)? {
                return Ok(false);
            }
            state.directory_delivery()?
        };

        log::debug!("Client {} joined room {}", id, room_name);
        self.deliver(delivery.0, delivery.1).await;
        Ok(true)
    }

    /// Remove a connection; refreshes the directory if it was registered
    pub async fn unregister(&self, id: &str) -> Result<bool> {
        let delivery = {
            let mut state = self.state.lock().await;
            let Some(connection) = state.remove_connection(id) else {
                return Ok(false);
            };
            log::debug!(
                "Client {} was connected for {:?}",
                id,
                connection.connection_duration()
            );
            log::info!("Current connections: {}", state.registry.client_count());
            state.directory_delivery()?
        };

        self.deliver(delivery.0, delivery.1).await;
        Ok(true)
    }

    /// Room the connection is currently in
    pub async fn current_room(&self, id: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.registry.current_room(id).map(str::to_string)
    }

    /// Cooldown gate for chat and gift events
    pub async fn allow_message(&self, id: &str) -> bool {
        self.state.lock().await.limiter.allow(id)
    }

    pub fn chat_cooldown(&self) -> Duration {
        self.config.chat_cooldown
    }

    /// Send an event to every connection in a room
    pub async fn route_to_room(&self, room_name: &str, event: &Event) -> Result<usize> {
        let frame = event.to_frame()?;
        let targets = {
            let state = self.state.lock().await;
            state.registry.room_targets(room_name)
        };

        let count = targets.len();
        self.deliver(targets, frame).await;
        Ok(count)
    }

    /// Send an event to every connection in every room
    pub async fn route_to_all(&self, event: &Event) -> Result<usize> {
        let frame = event.to_frame()?;
        let targets = {
            let state = self.state.lock().await;
            state.registry.all_targets()
        };

        let count = targets.len();
        self.deliver(targets, frame).await;
        Ok(count)
    }

    /// Send an event to a single connection
    pub async fn send_to(&self, id: &str, event: &Event) -> Result<bool> {
        let frame = event.to_frame()?;
        let target = {
            let state = self.state.lock().await;
            state.registry.target(id)
        };

        match target {
            Some(target) => {
                self.deliver(vec![target], frame).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Push the ranked directory to every connection
    pub async fn broadcast_directory(&self) -> Result<()> {
        let (targets, frame) = {
            let state = self.state.lock().await;
            state.directory_delivery()?
        };
        self.deliver(targets, frame).await;
        Ok(())
    }

    /// Ranked directory with live viewer counts
    pub async fn snapshot(&self) -> Vec<BroadcastView> {
        self.state.lock().await.snapshot()
    }

    pub async fn create_broadcast(&self, host: &str, title: &str) -> Broadcast {
        let broadcast = self.state.lock().await.directory.create(host, title);
        log::info!(
            "Broadcast {} started by {} in room {}",
            broadcast.id,
            broadcast.host,
            broadcast.room
        );
        broadcast
    }

    pub async fn like_broadcast(&self, id: &str) -> bool {
        self.state.lock().await.directory.like(id)
    }

    pub async fn end_broadcast(&self, id: &str, requester: &str) -> bool {
        let ended = self.state.lock().await.directory.end(id, requester);
        if ended {
            log::info!("Broadcast {} ended by {}", id, requester);
        } else {
            log::debug!("Ignoring end of broadcast {} requested by {}", id, requester);
        }
        ended
    }

    /// Credit gifts to the broadcast bound to `room_name`, if any
    pub async fn record_gifts(&self, room_name: &str, count: u32) -> bool {
        self.state.lock().await.directory.add_gifts(room_name, count)
    }

    /// Hand a record to the persistence queue without waiting
    pub fn persist(&self, record: ChatRecord) {
        self.persistence.submit(record);
    }

    /// Get connection count
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.registry.client_count()
    }

    /// Deliver a frame, evicting connections whose channel is closed.
    ///
    /// Each eviction round changes occupancy, so it is followed by one
    /// directory refresh whose own failures feed the next round.
    async fn deliver(&self, targets: Vec<Target>, frame: String) {
        let mut failed = router::fan_out(&targets, &frame);

        while !failed.is_empty() {
            match self.evict(&failed).await {
                Some((targets, frame)) => failed = router::fan_out(&targets, &frame),
                None => break,
            }
        }
    }

    async fn evict(&self, ids: &[ConnectionId]) -> Option<(Vec<Target>, String)> {
        let mut state = self.state.lock().await;

        let mut removed = 0;
        for id in ids {
            if state.remove_connection(id).is_some() {
                log::info!("Evicted unreachable client {}", id);
                removed += 1;
            }
        }
        if removed == 0 {
            return None;
        }

        match state.directory_delivery() {
            Ok(delivery) => Some(delivery),
            Err(e) => {
                log::error!("Failed to encode directory snapshot: {}", e);
                None
            }
        }
    }
}

// Shared reference to server manager
pub type SharedServerManager = Arc<ServerManager>;
