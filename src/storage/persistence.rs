//! Fire-and-forget hand-off from routing to a message sink
//!
//! Records go through a bounded channel drained by one background task.
//! Submitting never waits: when the queue is full or the consumer is gone
//! the record is dropped and a warning is logged.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::storage::traits::{ChatRecord, MessageSink};

#[derive(Clone)]
pub struct PersistenceQueue {
    sender: mpsc::Sender<ChatRecord>,
}

impl PersistenceQueue {
    /// Spawn the consumer task; must be called inside a tokio runtime
    pub fn start(sink: Arc<dyn MessageSink>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ChatRecord>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                let room = record.room.clone();
                if let Err(e) = sink.persist(record).await {
                    log::warn!("Failed to persist record for room {}: {}", room, e);
                }
            }
            log::debug!("Persistence queue closed");
        });

        Self { sender }
    }

    /// Queue a record without waiting
    pub fn submit(&self, record: ChatRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                log::warn!("Persistence queue full, dropping record for room {}", record.room);
            }
            Err(TrySendError::Closed(record)) => {
                log::warn!("Persistence queue closed, dropping record for room {}", record.room);
            }
        }
    }
}
