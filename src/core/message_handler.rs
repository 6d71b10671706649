//! Message handler with room-based routing and broadcast lifecycle

use chrono::Utc;

use crate::core::message::{
    clamp_gift, clamp_message, clamp_title, clamp_user, join_target, resolve_room, ChatMessage,
    Event, GiftMessage,
};
use crate::core::server::SharedServerManager;
use crate::error::{LiveSocksError, Result};
use crate::storage::traits::ChatRecord;

/// Handles incoming client frames and routes them appropriately
pub struct MessageHandler {
    server: SharedServerManager,
}

impl MessageHandler {
    /// Create a new message handler
    pub fn new(server: SharedServerManager) -> Self {
        Self { server }
    }

    /// Process one raw text frame from `sender_id`
    pub async fn handle_client_message(&self, sender_id: &str, message_text: &str) -> Result<()> {
        // An evicted connection may still have frames in flight
        let current_room = self
            .server
            .current_room(sender_id)
            .await
            .ok_or_else(|| LiveSocksError::SessionNotFound(sender_id.to_string()))?;

        let event = Event::decode(message_text, &current_room);
        log::debug!("Client {} sent {} in {}", sender_id, event.kind(), current_room);

        self.handle_event(sender_id, &current_room, event).await
    }

    /// Dispatch a decoded event
    pub async fn handle_event(&self, sender_id: &str, current_room: &str, event: Event) -> Result<()> {
        match event {
            Event::Join { room } => {
                self.server.join_room(sender_id, &join_target(&room)).await?;
                Ok(())
            }

            Event::BroadcastList { .. } => {
                let items = self.server.snapshot().await;
                self.server
                    .send_to(sender_id, &Event::broadcast_list(items))
                    .await?;
                Ok(())
            }

            Event::BroadcastCreate { host, title } => {
                self.handle_broadcast_create(sender_id, &host, &title).await
            }

            Event::BroadcastLike { id } => {
                self.server.like_broadcast(&id).await;
                self.server.broadcast_directory().await
            }

            Event::BroadcastEnd { id, user } => {
                self.server.end_broadcast(&id, &user).await;
                self.server.broadcast_directory().await
            }

            Event::Chat(chat) => self.handle_chat(sender_id, current_room, chat).await,

            Event::Gift(gift) => self.handle_gift(sender_id, current_room, gift).await,

            Event::BroadcastCreated { .. } | Event::System { .. } => {
                log::debug!("Ignoring server-only event from client {}", sender_id);
                Ok(())
            }
        }
    }

    async fn handle_broadcast_create(&self, sender_id: &str, host: &str, title: &str) -> Result<()> {
        let broadcast = self
            .server
            .create_broadcast(&clamp_user(host), &clamp_title(title))
            .await;

        let created = Event::BroadcastCreated {
            id: broadcast.id,
            room: broadcast.room,
        };
        self.server.send_to(sender_id, &created).await?;
        self.server.broadcast_directory().await
    }

    /// Apply the cooldown; on rejection notify the sender only
    async fn admit(&self, sender_id: &str, current_room: &str) -> Result<bool> {
        if self.server.allow_message(sender_id).await {
            return Ok(true);
        }

        log::warn!("Rate limit exceeded for client {}", sender_id);
        let cooldown = self.server.chat_cooldown();
        let notice = Event::system(
            current_room,
            format!(
                "Rate limit: one message every {:.1}s",
                cooldown.as_secs_f64()
            ),
        );
        self.server.send_to(sender_id, &notice).await?;
        Ok(false)
    }

    async fn handle_chat(&self, sender_id: &str, current_room: &str, chat: ChatMessage) -> Result<()> {
        if !self.admit(sender_id, current_room).await? {
            return Ok(());
        }

        let chat = ChatMessage {
            room: resolve_room(&chat.room, current_room),
            user: clamp_user(&chat.user),
            message: clamp_message(&chat.message),
            time: Some(Utc::now()),
        };

        self.server.persist(ChatRecord::from_chat(&chat));

        let room = chat.room.clone();
        let count = self.server.route_to_room(&room, &Event::Chat(chat)).await?;
        log::debug!("Chat from {} delivered to {} clients in {}", sender_id, count, room);
        Ok(())
    }

    async fn handle_gift(&self, sender_id: &str, current_room: &str, gift: GiftMessage) -> Result<()> {
        if !self.admit(sender_id, current_room).await? {
            return Ok(());
        }

        let gift = GiftMessage {
            room: resolve_room(&gift.room, current_room),
            user: clamp_user(&gift.user),
            gift: clamp_gift(&gift.gift),
            count: gift.count,
            message: clamp_message(&gift.message),
            time: Some(Utc::now()),
        };

        self.server.persist(ChatRecord::from_gift(&gift));

        let room = gift.room.clone();
        let count = gift.count;
        self.server.route_to_room(&room, &Event::Gift(gift)).await?;

        if self.server.record_gifts(&room, count).await {
            self.server.broadcast_directory().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::constants::LOBBY_ROOM;
    use crate::core::connection::Connection;
    use crate::core::server::ServerManager;
    use crate::storage::message_store::MemoryMessageStore;
    use crate::storage::traits::MessageSink;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use warp::ws::Message;

    struct Fixture {
        handler: MessageHandler,
        server: SharedServerManager,
        store: Arc<MemoryMessageStore>,
    }

    fn fixture(cooldown: Duration) -> Fixture {
        let store = Arc::new(MemoryMessageStore::new());
        let config = ServerConfig {
            chat_cooldown: cooldown,
            ..ServerConfig::default()
        };
        let server = Arc::new(ServerManager::new(config, store.clone()));
        Fixture {
            handler: MessageHandler::new(server.clone()),
            server,
            store,
        }
    }

    async fn connect(server: &SharedServerManager, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        server
            .register(Connection::with_id(id.to_string(), tx))
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Ok(text) = msg.to_str() {
                events.push(serde_json::from_str(text).unwrap());
            }
        }
        events
    }

    #[tokio::test]
    async fn test_chat_is_stamped_and_routed_to_room() {
        let f = fixture(Duration::ZERO);
        let mut rx1 = connect(&f.server, "c1").await;
        let mut rx2 = connect(&f.server, "c2").await;
        let mut rx3 = connect(&f.server, "c3").await;
        f.handler.handle_client_message("c3", r#"{"type":"join","room":"other"}"#).await.unwrap();
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx3);

        f.handler
            .handle_client_message(
                "c1",
                r#"{"type":"chat","user":"alice","message":"hi","time":"1999-01-01T00:00:00Z"}"#,
            )
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            match drain(rx).as_slice() {
                [Event::Chat(chat)] => {
                    assert_eq!(chat.room, LOBBY_ROOM);
                    assert_eq!(chat.user, "alice");
                    assert_eq!(chat.message, "hi");
                    assert!(chat.time.unwrap().timestamp() > 946_684_800);
                }
                other => panic!("unexpected events {:?}", other),
            }
        }
        assert!(drain(&mut rx3).is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_chat_gets_system_notice() {
        let f = fixture(Duration::from_secs(60));
        let mut rx1 = connect(&f.server, "c1").await;
        let mut rx2 = connect(&f.server, "c2").await;

        f.handler.handle_client_message("c1", r#"{"type":"chat","message":"one"}"#).await.unwrap();
        f.handler.handle_client_message("c1", r#"{"type":"gift","count":3}"#).await.unwrap();

        let kinds: Vec<_> = drain(&mut rx1).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["chat", "system"]);
        let kinds: Vec<_> = drain(&mut rx2).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["chat"]);
    }

    #[tokio::test]
    async fn test_other_kinds_bypass_limiter() {
        let f = fixture(Duration::from_secs(60));
        let mut rx1 = connect(&f.server, "c1").await;

        f.handler.handle_client_message("c1", r#"{"type":"chat","message":"one"}"#).await.unwrap();
        f.handler.handle_client_message("c1", r#"{"type":"broadcast_list"}"#).await.unwrap();

        let kinds: Vec<_> = drain(&mut rx1).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["chat", "broadcast_list"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_becomes_chat_in_current_room() {
        let f = fixture(Duration::ZERO);
        let mut rx1 = connect(&f.server, "c1").await;
        f.handler.handle_client_message("c1", r#"{"type":"join","room":"news"}"#).await.unwrap();
        drain(&mut rx1);

        f.handler.handle_client_message("c1", "plain text").await.unwrap();

        match drain(&mut rx1).as_slice() {
            [Event::Chat(chat)] => {
                assert_eq!(chat.room, "news");
                assert_eq!(chat.user, "unknown");
                assert_eq!(chat.message, "plain text");
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_lifecycle() {
        let f = fixture(Duration::ZERO);
        let mut rx1 = connect(&f.server, "c1").await;
        let mut rx2 = connect(&f.server, "c2").await;

        f.handler
            .handle_client_message("c1", r#"{"type":"broadcast_create","host":"alice","title":"장 마감 라이브"}"#)
            .await
            .unwrap();

        let events = drain(&mut rx1);
        let (id, room) = match events.as_slice() {
            [Event::BroadcastCreated { id, room }, Event::BroadcastList { items, .. }] => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].title, "장 마감 라이브");
                (id.clone(), room.clone())
            }
            other => panic!("unexpected events {:?}", other),
        };
        let kinds: Vec<_> = drain(&mut rx2).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["broadcast_list"]);

        let join = format!(r#"{{"type":"join","room":"{}"}}"#, room);
        f.handler.handle_client_message("c2", &join).await.unwrap();
        let like = format!(r#"{{"type":"broadcast_like","id":"{}"}}"#, id);
        f.handler.handle_client_message("c2", &like).await.unwrap();
        let gift = format!(r#"{{"type":"gift","room":"{}","user":"bob","count":5}}"#, room);
        f.handler.handle_client_message("c2", &gift).await.unwrap();

        let snapshot = f.server.snapshot().await;
        assert_eq!(snapshot[0].viewers, 1);
        assert_eq!(snapshot[0].likes, 1);
        assert_eq!(snapshot[0].gifts, 5);
        assert!((snapshot[0].score - 2.5).abs() < 1e-9);

        let end_by_other = format!(r#"{{"type":"broadcast_end","id":"{}","user":"bob"}}"#, id);
        f.handler.handle_client_message("c2", &end_by_other).await.unwrap();
        assert_eq!(f.server.snapshot().await.len(), 1);

        let end_by_host = format!(r#"{{"type":"broadcast_end","id":"{}","user":"alice"}}"#, id);
        f.handler.handle_client_message("c1", &end_by_host).await.unwrap();
        assert!(f.server.snapshot().await.is_empty());
        assert_eq!(f.server.current_room("c2").await.as_deref(), Some(room.as_str()));
    }

    struct FailingSink;

    #[async_trait]
    impl MessageSink for FailingSink {
        async fn persist(&self, _record: ChatRecord) -> Result<()> {
            Err(LiveSocksError::StorageError("disk full".to_string()))
        }
    }

    struct StalledSink;

    #[async_trait]
    impl MessageSink for StalledSink {
        async fn persist(&self, _record: ChatRecord) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    async fn chat_through_sink(sink: Arc<dyn MessageSink>) {
        let config = ServerConfig {
            chat_cooldown: Duration::ZERO,
            persist_queue_capacity: 1,
            ..ServerConfig::default()
        };
        let server: SharedServerManager = Arc::new(ServerManager::new(config, sink));
        let handler = MessageHandler::new(server.clone());
        let mut rx1 = connect(&server, "c1").await;
        let mut rx2 = connect(&server, "c2").await;

        for text in ["one", "two", "three"] {
            let frame = format!(r#"{{"type":"chat","user":"alice","message":"{}"}}"#, text);
            handler.handle_client_message("c1", &frame).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        for rx in [&mut rx1, &mut rx2] {
            let messages: Vec<_> = drain(rx)
                .into_iter()
                .map(|event| match event {
                    Event::Chat(chat) => chat.message,
                    other => panic!("unexpected event {:?}", other),
                })
                .collect();
            assert_eq!(messages, vec!["one", "two", "three"]);
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_affect_routing() {
        chat_through_sink(Arc::new(FailingSink)).await;
    }

    #[tokio::test]
    async fn test_stalled_sink_does_not_delay_routing() {
        tokio::time::timeout(Duration::from_secs(2), chat_through_sink(Arc::new(StalledSink)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_evicted_connection_cannot_chat() {
        let f = fixture(Duration::ZERO);
        let rx1 = connect(&f.server, "c1").await;
        let mut rx2 = connect(&f.server, "c2").await;
        drop(rx1);
        f.server.broadcast_directory().await.unwrap();
        assert!(f.server.current_room("c1").await.is_none());
        drain(&mut rx2);

        let result = f
            .handler
            .handle_client_message("c1", r#"{"type":"chat","message":"ghost"}"#)
            .await;

        assert!(matches!(result, Err(LiveSocksError::SessionNotFound(_))));
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_gift_outside_broadcast_room_does_not_score() {
        let f = fixture(Duration::ZERO);
        let _rx1 = connect(&f.server, "c1").await;
        let broadcast = f.server.create_broadcast("alice", "t").await;

        f.handler.handle_client_message("c1", r#"{"type":"gift","count":9}"#).await.unwrap();

        let snapshot = f.server.snapshot().await;
        assert_eq!(snapshot[0].id, broadcast.id);
        assert_eq!(snapshot[0].gifts, 0);
    }

    #[tokio::test]
    async fn test_chat_and_gift_are_persisted() {
        let f = fixture(Duration::ZERO);
        let _rx1 = connect(&f.server, "c1").await;

        f.handler.handle_client_message("c1", r#"{"type":"chat","message":"one"}"#).await.unwrap();
        f.handler.handle_client_message("c1", r#"{"type":"gift","gift":"🎈","count":2}"#).await.unwrap();

        for _ in 0..50 {
            if f.store.count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let records = f.store.recent(2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.as_deref(), Some("one"));
        assert_eq!(records[1].gift.as_deref(), Some("🎈"));
    }
}
