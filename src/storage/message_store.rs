//! Simple in-memory storage for recent chat records
//!
//! This implementation provides a basic circular buffer for storing
//! recent records without persisting to disk.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::constants::DEFAULT_HISTORY_SIZE;
use crate::error::{LiveSocksError, Result};
use crate::storage::traits::{ChatRecord, MessageSink};

/// In-memory record store with a maximum capacity
pub struct MemoryMessageStore {
    records: Mutex<VecDeque<ChatRecord>>,
    max_size: usize,
}

impl MemoryMessageStore {
    /// Create a new store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// Create a store with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            max_size: capacity,
        }
    }

    /// Add a record, removing the oldest if at capacity
    pub fn add_record(&self, record: ChatRecord) -> Result<()> {
        if self.max_size == 0 {
            return Ok(());
        }

        let mut records = self
            .records
            .lock()
            .map_err(|e| LiveSocksError::StorageError(format!("Mutex poisoned: {}", e)))?;

        if records.len() >= self.max_size {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    /// Get recent records up to a specified limit, oldest first
    pub fn recent(&self, limit: usize) -> Vec<ChatRecord> {
        match self.records.lock() {
            Ok(records) => {
                let skip = records.len().saturating_sub(limit);
                records.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Get the number of stored records
    pub fn count(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for MemoryMessageStore {
    async fn persist(&self, record: ChatRecord) -> Result<()> {
        self.add_record(record)
    }
}
