//! Abstract storage interface for pluggable chat persistence backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::message::{ChatMessage, GiftMessage};
use crate::error::Result;

/// Kind of a persisted chat event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Chat,
    Gift,
}

/// One chat or gift event as handed to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub room: String,
    pub kind: RecordKind,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    pub time: DateTime<Utc>,
}

impl ChatRecord {
    pub fn from_chat(chat: &ChatMessage) -> Self {
        Self {
            room: chat.room.clone(),
            kind: RecordKind::Chat,
            user: chat.user.clone(),
            message: Some(chat.message.clone()),
            gift: None,
            count: None,
            time: chat.time.unwrap_or_else(Utc::now),
        }
    }

    pub fn from_gift(gift: &GiftMessage) -> Self {
        Self {
            room: gift.room.clone(),
            kind: RecordKind::Gift,
            user: gift.user.clone(),
            message: None,
            gift: Some(gift.gift.clone()),
            count: Some(gift.count),
            time: gift.time.unwrap_or_else(Utc::now),
        }
    }
}

/// Durable destination for chat and gift events
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Store one record
    async fn persist(&self, record: ChatRecord) -> Result<()>;
}
