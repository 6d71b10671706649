//! Storage mechanisms for persisting chat and gift records

pub mod jsonl;
pub mod message_store;
pub mod persistence;
pub mod traits;

pub use jsonl::JsonLinesStore;
pub use message_store::MemoryMessageStore;
pub use persistence::PersistenceQueue;
pub use traits::{ChatRecord, MessageSink, RecordKind};
