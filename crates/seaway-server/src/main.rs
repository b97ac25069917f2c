//! Seaway Server - vessel traffic backend: AIS ingestion, metrics and routing

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seaway_server::config::Config;
use seaway_server::state::AppState;
use seaway_server::{api, land, loops, persistence};

/// Queue depth between the HTTP/AIS ingest path and the persistence loop.
const PERSIST_QUEUE_CAPACITY: usize = 4096;

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("seaway_server=debug".parse()?);
    let json = std::env::var("SEAWAY_LOG_JSON").map(|v| v == "1").unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    tracing::info!("Starting Seaway Server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections).await?;
    let land_mask = land::load_land_mask(&config.land_geojson_path, config.land_buffer_deg);

    let state = Arc::new(AppState::with_database(db.clone(), config).with_land(land_mask));
    let restored = state.load_from_database().await?;
    tracing::info!(vessels = restored, "Restored vessel positions");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (persist_tx, persist_rx) = mpsc::channel(PERSIST_QUEUE_CAPACITY);
    state.set_persist_sender(persist_tx);

    let persist_handle = tokio::spawn(loops::position_persist_loop::run_position_persist_loop(
        db,
        state.clone(),
        persist_rx,
        shutdown_tx.subscribe(),
    ));
    let feed_handle = tokio::spawn(loops::ais_feed_loop::run_ais_feed_loop(
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    let app = api::routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    // Background loops flush what they hold before exiting.
    let _ = shutdown_tx.send(());
    let _ = feed_handle.await;
    let _ = persist_handle.await;

    tracing::info!("Seaway Server stopped");
    Ok(())
}
