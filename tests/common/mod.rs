// Shared helpers for integration tests against an in-process hub

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use live_socks::config::ServerConfig;
use live_socks::core::message::Event;
use live_socks::core::server::{ServerManager, SharedServerManager};
use live_socks::handlers::routes;
use live_socks::storage::MemoryMessageStore;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub server: SharedServerManager,
    pub store: Arc<MemoryMessageStore>,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }

    /// Connect and consume the initial directory snapshot
    pub async fn connect(&self) -> Client {
        let (mut client, _) = connect_async(self.ws_url()).await.expect("connect");
        let first = next_event(&mut client).await;
        assert_eq!(first.kind(), "broadcast_list");
        client
    }
}

/// Start a hub on an ephemeral port
pub async fn start_server(config: ServerConfig) -> TestServer {
    let store = Arc::new(MemoryMessageStore::with_capacity(config.history_size));
    let server = Arc::new(ServerManager::new(config, store.clone()));
    let (addr, serving) = warp::serve(routes(server.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(serving);

    TestServer { addr, server, store }
}

pub fn config_without_cooldown() -> ServerConfig {
    ServerConfig {
        chat_cooldown: Duration::ZERO,
        ..ServerConfig::default()
    }
}

pub async fn send(client: &mut Client, frame: &str) {
    client
        .send(Message::Text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Next text frame decoded as an event
pub async fn next_event(client: &mut Client) -> Event {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("decode event");
        }
    }
}

/// Skip frames until one of the given kind arrives
pub async fn next_of_kind(client: &mut Client, kind: &str) -> Event {
    loop {
        let event = next_event(client).await;
        if event.kind() == kind {
            return event;
        }
    }
}

/// Assert nothing arrives for a short while
pub async fn assert_silent(client: &mut Client) {
    let waited = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(waited.is_err(), "unexpected frame: {:?}", waited);
}

/// TCP relay in front of a hub whose live links can be cut on demand
pub struct LinkCutter {
    pub addr: SocketAddr,
    links: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl LinkCutter {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Drop every relayed connection, as if the network went away
    pub fn cut_all(&self) {
        for link in self.links.lock().unwrap().drain(..) {
            link.abort();
        }
    }
}

pub async fn start_link_cutter(upstream: SocketAddr) -> LinkCutter {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    let links = Arc::new(Mutex::new(Vec::new()));

    let tracked = links.clone();
    tokio::spawn(async move {
        while let Ok((mut downstream, _)) = listener.accept().await {
            let link = tokio::spawn(async move {
                if let Ok(mut hub) = TcpStream::connect(upstream).await {
                    let _ = tokio::io::copy_bidirectional(&mut downstream, &mut hub).await;
                }
            });
            tracked.lock().unwrap().push(link);
        }
    });

    LinkCutter { addr, links }
}
