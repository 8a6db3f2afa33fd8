//! Prometheus Metrics
//!
//! The turn logic records its own counters (`bot_turns_total`,
//! `bot_routes_total`, `bot_validation_failures_total`); this module installs
//! the recorder, adds the HTTP-level series and serves `GET /metrics`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` when a recorder is already installed (e.g. a second call
/// in the same process).
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        },
    }
}

/// Count one handled request
pub fn record_request(endpoint: &'static str, status: StatusCode) {
    metrics::counter!(
        "http_requests_total",
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

/// Wall time of one turn, lock wait included
pub fn record_turn_latency(seconds: f64) {
    metrics::histogram!("bot_turn_duration_seconds").record(seconds);
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics are disabled".to_string(),
        ),
    }
}
