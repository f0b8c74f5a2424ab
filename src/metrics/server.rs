//! HTTP exposition for the metrics registry.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::models::{NomosError, Result};

use super::MetricsRegistry;

/// Serve `/metrics` and `/healthz` until the shutdown signal flips.
pub async fn serve(
    addr: SocketAddr,
    registry: Arc<MetricsRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(export_metrics))
        .route("/healthz", get(healthz))
        .with_state(registry);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NomosError::metrics(format!("binding {addr}"), e))?;

    info!(%addr, "Serving metrics endpoint");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .map_err(|e| NomosError::metrics("serving metrics endpoint", e))
}

async fn export_metrics(State(registry): State<Arc<MetricsRegistry>>) -> String {
    registry.export()
}

async fn healthz() -> &'static str {
    "ok"
}
