use futures_util::sink::SinkExt;
use futures_util::stream::{Stream, StreamExt};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use warp::ws::{Message, WebSocket};

use crate::core::connection::Connection;
use crate::core::message_handler::MessageHandler;
use crate::core::server::SharedServerManager;
use crate::error::LiveSocksError;

/// Outcome of waiting for the next inbound frame
enum Inbound {
    Frame(Message),
    Closed,
    TimedOut,
}

// Handle a WebSocket connection
pub async fn handle_ws_client(ws: WebSocket, server: SharedServerManager) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Spawn a task to forward messages from our channel to the WebSocket
    tokio::task::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let connection = Connection::new(tx.clone());
    let client_id = connection.id.clone();

    if let Err(e) = server.register(connection).await {
        error!("Failed to register client {}: {}", client_id, e);
        return;
    }
    info!("Client connected: {}", client_id);

    let handler = MessageHandler::new(server.clone());
    let ping_interval = server.config().ping_interval;
    let ping_timeout = server.config().ping_timeout;

    loop {
        let message = match next_frame(&mut ws_rx, ping_interval).await {
            Inbound::Frame(message) => message,
            Inbound::Closed => break,
            Inbound::TimedOut => {
                debug!("Client {} idle, sending ping", client_id);
                if tx.send(Message::ping(Vec::new())).is_err() {
                    break;
                }
                match next_frame(&mut ws_rx, ping_timeout).await {
                    Inbound::Frame(message) => message,
                    Inbound::Closed => break,
                    Inbound::TimedOut => {
                        warn!("Client {} missed ping deadline, closing", client_id);
                        let _ = tx.send(Message::close());
                        break;
                    }
                }
            }
        };

        if message.is_close() {
            break;
        }

        // Only process text messages
        if let Ok(text) = message.to_str() {
            match handler.handle_client_message(&client_id, text).await {
                Ok(()) => {}
                Err(LiveSocksError::SessionNotFound(_)) => {
                    info!("Client {} was evicted, closing", client_id);
                    break;
                }
                Err(e) => warn!("Failed to handle message from {}: {}", client_id, e),
            }
        }
    }

    // Client disconnected
    match server.unregister(&client_id).await {
        Ok(true) => info!("Client disconnected: {}", client_id),
        Ok(false) => debug!("Client {} was already removed", client_id),
        Err(e) => error!("Error unregistering client {}: {}", client_id, e),
    }
}

async fn next_frame<S>(ws_rx: &mut S, wait: Duration) -> Inbound
where
    S: Stream<Item = Result<Message, warp::Error>> + Unpin,
{
    match timeout(wait, ws_rx.next()).await {
        Ok(Some(Ok(message))) => Inbound::Frame(message),
        Ok(Some(Err(e))) => {
            error!("WebSocket error: {}", e);
            Inbound::Closed
        }
        Ok(None) => Inbound::Closed,
        Err(_) => Inbound::TimedOut,
    }
}
