mod config;
mod db;
mod errors;
mod functions_client;
mod journey;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::functions_client::EdgeFunctionClient;
use crate::journey::controller::ControllerSettings;
use crate::journey::registry::ControllerRegistry;
use crate::journey::store::PgJourneyStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sigma journey service v{}", env!("CARGO_PKG_VERSION"));

    // Journey state store (read-only)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgJourneyStore::new(db));

    // Remote stage executors
    let functions = Arc::new(EdgeFunctionClient::new(
        &config.functions_url,
        config.functions_api_key.clone(),
    )?);
    info!("Edge function client initialized ({})", config.functions_url);

    let settings = ControllerSettings {
        reload_delay: config.reload_delay,
        stage_timeout: config.stage_timeout,
    };
    info!(
        "Stage timeout {}s, reload delay {}ms",
        settings.stage_timeout.as_secs(),
        settings.reload_delay.as_millis()
    );

    let state = AppState {
        registry: Arc::new(ControllerRegistry::new(store, functions, settings)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
