use axum::routing::get;
use axum::Router;
use sandbox_server::config::ServerConfig;
use sandbox_server::world_loop::{run_world_loop, Outbound, WorldCommand};
use sandbox_server::ws::{ws_handler, AppState};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let (world_tx, world_rx) = mpsc::channel::<WorldCommand>(config.command_buffer);
    let (outbound_tx, _) = broadcast::channel::<Outbound>(config.broadcast_buffer);

    // Spawn world loop
    tokio::spawn(run_world_loop(world_rx, outbound_tx.clone()));

    let app_state = AppState {
        world_tx,
        outbound_tx,
        max_message_bytes: config.max_message_bytes,
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting sandbox server on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await
}
