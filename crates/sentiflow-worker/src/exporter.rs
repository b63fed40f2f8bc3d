//! Prometheus exposition endpoint.
//!
//! Serves the worker's registry in text format on `GET /metrics`, bound to
//! `METRICS_ADDR`. The endpoint is the only consumer-facing surface of the
//! counters in [`crate::metrics`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;

use crate::metrics::REGISTRY;

/// Handler for the Prometheus metrics endpoint
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", encoder.format_type())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Create the metrics router
pub fn create_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve the metrics endpoint on an already-bound listener.
///
/// Runs until the process exits; the pipeline does not wait for it during
/// shutdown.
pub async fn serve(listener: TcpListener) {
    if let Err(e) = axum::serve(listener, create_metrics_router()).await {
        tracing::error!(error = %e, "metrics endpoint terminated");
    }
}
