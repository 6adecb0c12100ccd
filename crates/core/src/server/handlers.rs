use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runtime::Monitor;
use crate::telemetry::metrics::render_prometheus;

const DEFAULT_HISTORY_HOURS: u32 = 24;
const DEFAULT_ADJUSTMENT_LIMIT: usize = 10;

/// Probe body: the snapshot plus the time it was taken.
#[derive(Serialize)]
struct Stamped<T: Serialize> {
    #[serde(flatten)]
    body: T,
    timestamp: DateTime<Utc>,
}

fn stamped<T: Serialize>(body: T) -> Json<Stamped<T>> {
    Json(Stamped { body, timestamp: Utc::now() })
}

/// GET /
pub async fn index(State(monitor): State<Monitor>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "thermoguard",
        "version": env!("CARGO_PKG_VERSION"),
        "phase": monitor.phase().as_str(),
        "endpoints": [
            "/health",
            "/ready",
            "/metrics",
            "/api/temperature/latest",
            "/api/temperature/history",
            "/api/adjustments",
        ],
    }))
}

/// GET /health
pub async fn health(State(monitor): State<Monitor>) -> impl IntoResponse {
    let health = monitor.health_status();
    let code = if health.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, stamped(health))
}

/// GET /ready
pub async fn ready(State(monitor): State<Monitor>) -> impl IntoResponse {
    let readiness = monitor.readiness_status();
    let code = if readiness.ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, stamped(readiness))
}

/// GET /metrics
pub async fn prometheus_metrics(State(monitor): State<Monitor>) -> impl IntoResponse {
    let body = render_prometheus(&monitor.health_status(), monitor.latest_reading().as_ref());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// GET /api/temperature/latest
pub async fn latest_temperature(State(monitor): State<Monitor>) -> impl IntoResponse {
    Json(monitor.latest_reading())
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<u32>,
}

/// GET /api/temperature/history
pub async fn temperature_history(
    State(monitor): State<Monitor>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    Json(monitor.reading_history(params.hours.unwrap_or(DEFAULT_HISTORY_HOURS)))
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentParams {
    pub limit: Option<usize>,
}

/// GET /api/adjustments
pub async fn adjustments(
    State(monitor): State<Monitor>,
    Query(params): Query<AdjustmentParams>,
) -> impl IntoResponse {
    Json(monitor.adjustment_history(params.limit.unwrap_or(DEFAULT_ADJUSTMENT_LIMIT)))
}
