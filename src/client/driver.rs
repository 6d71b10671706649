//! Outbound connection to a hub with a send queue and an ordered inbound stream
//!
//! The driver owns at most one connection at a time. `send` always enqueues;
//! when no connection is up it also starts one in the background. Every
//! connection begins by re-joining the last known room, then drains the
//! queue and reads the socket concurrently. When the connection ends the
//! consumer sees exactly one [`ClientEvent::Disconnected`] and nothing is
//! retried until the next `send` or `reconnect`.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::config::ClientConfig;
use crate::constants::LOBBY_ROOM;
use crate::core::message::{join_target, Event};
use crate::error::{LiveSocksError, Result};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Items delivered to the consumer, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A frame received from the hub
    Server(Event),
    /// A text frame that did not decode into a known event
    Unreadable(String),
    /// The connection attempt failed or the connection was lost
    Disconnected { reason: String },
}

/// Receiving half handed to the consumer
pub type Inbound = mpsc::UnboundedReceiver<ClientEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
struct DriverState {
    connection: ConnectionState,
    room: String,
}

struct Shared {
    config: ClientConfig,
    state: Mutex<DriverState>,
    outbound: AsyncMutex<mpsc::UnboundedReceiver<Event>>,
    inbound: mpsc::UnboundedSender<ClientEvent>,
}

/// Handle to the client protocol driver; clones share one connection
#[derive(Clone)]
pub struct ClientDriver {
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Event>,
}

impl ClientDriver {
    /// Create an idle driver; nothing connects until the first `send`
    pub fn new(config: ClientConfig) -> (Self, Inbound) {
        let (queue, outbound) = mpsc::unbounded_channel();
        let (inbound, rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(DriverState {
                connection: ConnectionState::Disconnected,
                room: LOBBY_ROOM.to_string(),
            }),
            outbound: AsyncMutex::new(outbound),
            inbound,
        });

        (Self { shared, queue }, rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Queue an event, connecting first if needed
    pub fn send(&self, event: Event) -> Result<()> {
        if let Event::Join { room } = &event {
            self.shared.lock_state().room = join_target(room);
        }

        self.queue
            .send(event)
            .map_err(|_| LiveSocksError::ConnectionClosed)?;
        self.reconnect();
        Ok(())
    }

    /// Start a connection attempt unless one is already up or in progress
    pub fn reconnect(&self) -> bool {
        {
            let mut state = self.shared.lock_state();
            if state.connection != ConnectionState::Disconnected {
                return false;
            }
            state.connection = ConnectionState::Connecting;
        }

        let shared = self.shared.clone();
        tokio::spawn(async move { shared.run().await });
        true
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock_state().connection
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Last room this driver joined
    pub fn current_room(&self) -> String {
        self.shared.lock_state().room.clone()
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_connection(&self, connection: ConnectionState) {
        self.lock_state().connection = connection;
    }

    fn emit(&self, event: ClientEvent) {
        if self.inbound.send(event).is_err() {
            debug!("Inbound consumer is gone, dropping event");
        }
    }

    /// One connection attempt, ending with a single disconnect notice
    async fn run(self: Arc<Self>) {
        let url = self.config.url.as_str();
        let reason = match connect_async(url).await {
            Ok((socket, _)) => {
                info!("Connected to {}", url);
                self.set_connection(ConnectionState::Connected);
                self.session(socket).await
            }
            Err(e) => format!("connect failed: {}", e),
        };

        info!("Disconnected from {}: {}", url, reason);
        self.set_connection(ConnectionState::Disconnected);
        self.emit(ClientEvent::Disconnected { reason });
    }

    /// Service a live socket until it fails; returns the reason
    async fn session(&self, socket: Socket) -> String {
        let (mut write, mut read) = socket.split();

        let room = self.lock_state().room.clone();
        let rejoin = match (Event::Join { room }).to_frame() {
            Ok(frame) => frame,
            Err(e) => return format!("encode failed: {}", e),
        };
        if let Err(e) = write.send(Message::Text(rejoin)).await {
            return format!("send failed: {}", e);
        }

        let mut outbound = self.outbound.lock().await;

        loop {
            tokio::select! {
                queued = outbound.recv() => match queued {
                    Some(event) => match event.to_frame() {
                        Ok(frame) => {
                            if let Err(e) = write.send(Message::Text(frame)).await {
                                return format!("send failed: {}", e);
                            }
                        }
                        Err(e) => warn!("Dropping unencodable {} event: {}", event.kind(), e),
                    },
                    None => {
                        let _ = write.close().await;
                        return "driver closed".to_string();
                    }
                },

                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.deliver(text),
                    Some(Ok(Message::Close(_))) => return "closed by server".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return format!("receive failed: {}", e),
                    None => return "connection closed".to_string(),
                },
            }
        }
    }

    fn deliver(&self, text: String) {
        match serde_json::from_str::<Event>(&text) {
            Ok(event) => self.emit(ClientEvent::Server(event)),
            Err(e) => {
                debug!("Unreadable frame from server: {}", e);
                self.emit(ClientEvent::Unreadable(text));
            }
        }
    }
}
