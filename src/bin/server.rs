use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use live_socks::config::ServerConfig;
use live_socks::core::server::ServerManager;
use live_socks::handlers::routes;
use live_socks::storage::{JsonLinesStore, MemoryMessageStore, MessageSink};

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    let sink: Arc<dyn MessageSink> = match &config.persist_path {
        Some(path) => match JsonLinesStore::open(path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Arc::new(MemoryMessageStore::with_capacity(config.history_size)),
    };

    // Build the server address
    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let server = Arc::new(ServerManager::new(config, sink));

    // Start the server
    info!("Starting Live Socks server on {}", addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    };

    match warp::serve(routes(server)).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok((_, running)) => running.await,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}
