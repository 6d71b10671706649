//! Best-effort fan-out of encoded frames
//!
//! Targets are resolved by the caller while holding the hub lock; delivery
//! here happens after the lock is released. A failed send never stops
//! delivery to the remaining targets, the failing ids are returned so the
//! caller can evict them.

use std::collections::HashSet;
use tokio::sync::mpsc;
use warp::ws::Message;

use crate::core::connection::ConnectionId;

/// A resolved fan-out recipient
#[derive(Debug, Clone)]
pub struct Target {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<Message>,
}

/// Send `frame` to every target, returning ids whose channel is closed
pub fn fan_out(targets: &[Target], frame: &str) -> Vec<ConnectionId> {
    let mut failed = Vec::new();

    for target in targets {
        if target.sender.send(Message::text(frame)).is_err() {
            log::warn!("Failed to send message to client {}", target.id);
            failed.push(target.id.clone());
        }
    }

    log::trace!(
        "Fan-out delivered to {} of {} clients",
        targets.len() - failed.len(),
        targets.len()
    );
    failed
}

/// Keep the first occurrence of each connection id
pub fn dedup(targets: Vec<Target>) -> Vec<Target> {
    let mut seen = HashSet::with_capacity(targets.len());
    targets
        .into_iter()
        .filter(|target| seen.insert(target.id.clone()))
        .collect()
}
