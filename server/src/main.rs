use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use bubbles_server::config::ServerConfig;
use bubbles_server::relay::{run_relay, RelayBroadcast, RelayCommand};
use bubbles_server::ws::{ws_handler, AppState};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();

    let (relay_tx, relay_rx) = mpsc::channel::<RelayCommand>(config.command_buffer);
    let (broadcast_tx, _) = broadcast::channel::<RelayBroadcast>(config.broadcast_buffer);

    let app_state = AppState {
        relay_tx,
        broadcast_tx: broadcast_tx.clone(),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
    };

    // Spawn relay loop
    tokio::spawn(async move {
        run_relay(relay_rx, broadcast_tx, config).await;
    });

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Bubbles relay listening on {}", listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
