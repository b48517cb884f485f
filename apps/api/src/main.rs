mod config;
mod errors;
mod routes;
mod state;
mod vendor;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vendor::VendorClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing vendor credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jdmatch API v{}", env!("CARGO_PKG_VERSION"));

    let vendor = VendorClient::new(config.vendor.clone())?;
    info!(
        "Vendor client initialized (base: {}, workflow: {})",
        config.vendor.base_url, config.vendor.workflow_id
    );
    info!(
        "Poll policy: every {}ms, max attempts {:?}",
        config.poll.interval.as_millis(),
        config.poll.max_attempts
    );

    let state = AppState::new(Arc::new(vendor), config.clone());

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
