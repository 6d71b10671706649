//! Wire events exchanged between clients and the hub
//!
//! Every frame is one JSON object whose `type` field selects the variant.
//! Frames that do not decode into a known variant are turned into a plain
//! chat message addressed to the sender's current room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GIFT, DEFAULT_TITLE, LOBBY_ROOM, MAX_GIFT_LEN, MAX_MESSAGE_LEN, MAX_TITLE_LEN,
    MAX_USER_LEN, UNKNOWN_USER,
};
use crate::core::directory::BroadcastView;
use crate::error::Result;

fn unknown_user() -> String {
    UNKNOWN_USER.to_string()
}

fn default_gift() -> String {
    DEFAULT_GIFT.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_count() -> u32 {
    1
}

/// Text chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub room: String,
    #[serde(default = "unknown_user")]
    pub user: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(room: impl Into<String>, user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            user: user.into(),
            message: message.into(),
            time: None,
        }
    }
}

/// Gift sent into a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftMessage {
    #[serde(default)]
    pub room: String,
    #[serde(default = "unknown_user")]
    pub user: String,
    #[serde(default = "default_gift")]
    pub gift: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl GiftMessage {
    pub fn new(room: impl Into<String>, user: impl Into<String>, gift: impl Into<String>, count: u32) -> Self {
        Self {
            room: room.into(),
            user: user.into(),
            gift: gift.into(),
            count,
            message: String::new(),
            time: None,
        }
    }
}

/// One frame of the wire protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Move the sending connection to another room
    Join {
        #[serde(default)]
        room: String,
    },

    Chat(ChatMessage),

    Gift(GiftMessage),

    /// Start a live broadcast
    BroadcastCreate {
        #[serde(default = "unknown_user")]
        host: String,
        #[serde(default = "default_title")]
        title: String,
    },

    /// Reply to the creator of a broadcast
    BroadcastCreated { id: String, room: String },

    BroadcastLike {
        #[serde(default)]
        id: String,
    },

    /// End a broadcast; only honoured when `user` is its host
    BroadcastEnd {
        #[serde(default)]
        id: String,
        #[serde(default = "unknown_user", alias = "host")]
        user: String,
    },

    /// Request (no items) or ranked directory snapshot
    BroadcastList {
        #[serde(default)]
        items: Vec<BroadcastView>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<DateTime<Utc>>,
    },

    /// Server notice
    System {
        room: String,
        message: String,
        time: DateTime<Utc>,
    },
}

impl Event {
    /// Decode a raw frame, falling back to a bare chat message in `current_room`
    pub fn decode(raw: &str, current_room: &str) -> Event {
        match serde_json::from_str::<Event>(raw) {
            Ok(event) => event,
            Err(e) => {
                log::debug!("Treating undecodable frame as chat: {}", e);
                Event::Chat(ChatMessage::new(current_room, UNKNOWN_USER, raw))
            }
        }
    }

    /// Serialize into a text frame
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Join { .. } => "join",
            Event::Chat(_) => "chat",
            Event::Gift(_) => "gift",
            Event::BroadcastCreate { .. } => "broadcast_create",
            Event::BroadcastCreated { .. } => "broadcast_created",
            Event::BroadcastLike { .. } => "broadcast_like",
            Event::BroadcastEnd { .. } => "broadcast_end",
            Event::BroadcastList { .. } => "broadcast_list",
            Event::System { .. } => "system",
        }
    }

    /// A snapshot response carrying the current server time
    pub fn broadcast_list(items: Vec<BroadcastView>) -> Event {
        Event::BroadcastList {
            items,
            time: Some(Utc::now()),
        }
    }

    /// Empty snapshot request
    pub fn list_request() -> Event {
        Event::BroadcastList {
            items: Vec::new(),
            time: None,
        }
    }

    pub fn system(room: impl Into<String>, message: impl Into<String>) -> Event {
        Event::System {
            room: room.into(),
            message: message.into(),
            time: Utc::now(),
        }
    }
}

/// Truncate to at most `max` characters, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Resolve a requested room name; blank means `fallback`
pub fn resolve_room(requested: &str, fallback: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Room named by a join request; blank means the lobby
pub fn join_target(requested: &str) -> String {
    resolve_room(requested, LOBBY_ROOM)
}

pub fn clamp_user(user: &str) -> String {
    truncate_chars(user, MAX_USER_LEN)
}

pub fn clamp_message(message: &str) -> String {
    truncate_chars(message, MAX_MESSAGE_LEN)
}

pub fn clamp_gift(gift: &str) -> String {
    truncate_chars(gift, MAX_GIFT_LEN)
}

pub fn clamp_title(title: &str) -> String {
    truncate_chars(title, MAX_TITLE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_with_defaults() {
        let event = Event::decode(r#"{"type":"chat","message":"hi"}"#, "lobby");
        match event {
            Event::Chat(chat) => {
                assert_eq!(chat.room, "");
                assert_eq!(chat.user, "unknown");
                assert_eq!(chat.message, "hi");
                assert!(chat.time.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_falls_back_to_chat() {
        let event = Event::decode("hello there", "bcast:b0123456789");
        assert_eq!(
            event,
            Event::Chat(ChatMessage::new("bcast:b0123456789", "unknown", "hello there"))
        );
    }

    #[test]
    fn test_decode_unknown_type_falls_back_to_chat() {
        let raw = r#"{"type":"teleport","room":"x"}"#;
        match Event::decode(raw, "lobby") {
            Event::Chat(chat) => {
                assert_eq!(chat.room, "lobby");
                assert_eq!(chat.message, raw);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_gift_defaults() {
        match Event::decode(r#"{"type":"gift","room":"bcast:b1"}"#, "lobby") {
            Event::Gift(gift) => {
                assert_eq!(gift.gift, "🎁");
                assert_eq!(gift.count, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_end_accepts_host_alias() {
        let event = Event::decode(r#"{"type":"broadcast_end","id":"b1","host":"alice"}"#, "lobby");
        assert_eq!(
            event,
            Event::BroadcastEnd {
                id: "b1".to_string(),
                user: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_list_request_has_no_items() {
        let event = Event::decode(r#"{"type":"broadcast_list"}"#, "lobby");
        assert_eq!(event, Event::list_request());
        assert_eq!(Event::list_request().to_frame().unwrap(), r#"{"type":"broadcast_list","items":[]}"#);
    }

    #[test]
    fn test_non_ascii_is_preserved() {
        let chat = Event::Chat(ChatMessage::new("전체방", "주헌", "안녕하세요 🎈"));
        let frame = chat.to_frame().unwrap();
        assert!(frame.contains("안녕하세요 🎈"));
        assert_eq!(Event::decode(&frame, "lobby"), chat);
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[test]
    fn test_join_target_defaults_to_lobby() {
        assert_eq!(join_target("   "), "lobby");
        assert_eq!(join_target(" news "), "news");
    }
}
