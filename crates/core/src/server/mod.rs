//! HTTP surface for probes, metrics and the dashboard.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Service info |
//! | GET | `/health` | Health snapshot, 503 when degraded |
//! | GET | `/ready` | Readiness snapshot, 503 when not ready |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/api/temperature/latest` | Latest reading or `null` |
//! | GET | `/api/temperature/history?hours=N` | Readings in the window (default 24) |
//! | GET | `/api/adjustments?limit=N` | Adjustments, most recent first (default 10) |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::runtime::Monitor;

/// Build the complete router over a shared monitor.
pub fn router(monitor: Monitor) -> Router {
    let api_routes = Router::new()
        .route("/temperature/latest", get(handlers::latest_temperature))
        .route("/temperature/history", get(handlers::temperature_history))
        .route("/adjustments", get(handlers::adjustments));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest("/api", api_routes)
        .with_state(monitor)
}

/// Serve until `token` is cancelled.
pub async fn serve(monitor: Monitor, port: u16, token: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(async move {
            token.cancelled().await;
            tracing::info!("http server shutting down");
        })
        .await
}
