//! Cardio Risk Service - Main Entry Point

use anyhow::Context;
use api::{build_state, create_rate_limited_router, init_logging, install_metrics, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_logging(&settings.logging);

    info!("=== Cardio Risk Service v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = install_metrics().context("installing metrics recorder")?;
    let state = build_state(&settings)
        .await
        .context("opening storage")?
        .with_metrics(metrics);
    let app = create_rate_limited_router(Arc::new(state), &settings.rate_limit)?;

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.server.bind_addr))?;
    info!("Starting API server on {}", settings.server.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
