//! Relief dispatch server - allocation, routing, and fleet coordination.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relief_server::config::Config;
use relief_server::state::AppState;
use relief_server::telemetry::SimulatedTelemetry;
use relief_server::{api, loops, persistence, seed};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relief_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting relief dispatch server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let state = Arc::new(AppState::new(db.clone(), config.clone()));

    let restored = state.load_fleet().await?;
    tracing::info!("Restored {restored} drones from database");
    if config.seed_demo_data {
        seed::seed_demo_data(&state).await?;
    }

    // Start background loops
    let (shutdown_tx, _) = broadcast::channel(1);
    let telemetry = Arc::new(SimulatedTelemetry::new(
        config.position_jitter_deg,
        config.battery_drain_per_tick,
        config.battery_charge_per_tick,
    ));
    tokio::spawn(loops::telemetry_loop::run_telemetry_loop(
        state.clone(),
        telemetry,
        shutdown_tx.subscribe(),
    ));
    tokio::spawn(loops::fleet_persist_loop::run_fleet_persist_loop(
        db,
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state.clone())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    // Drain: stop loops, flush the registry snapshot.
    let _ = shutdown_tx.send(());
    state.flush_fleet().await?;
    tracing::info!("Fleet state flushed, goodbye");

    Ok(())
}
