//! Special endpoint handlers for the proxy.
//!
//! This module provides response generators for built-in endpoints:
//! - `/health` - Liveness check with the current time
//! - `/metrics` - Prometheus metrics export
//! - CORS preflight and the catch-all 404
//!
//! Functions return a `GatewayResponse` instead of writing directly to the
//! session, so the caller decides on headers and compression.

use chrono::{SecondsFormat, Utc};

use crate::metrics::GatewayMetrics;
use crate::pipeline::GatewayResponse;

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Generate response for /health endpoint.
pub fn handle_health() -> GatewayResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
    .to_string();

    GatewayResponse::new(200, "application/json", body)
}

/// Generate response for /metrics endpoint.
pub fn handle_metrics(metrics: &GatewayMetrics) -> GatewayResponse {
    GatewayResponse::new(200, PROMETHEUS_CONTENT_TYPE, metrics.export())
}

/// `OPTIONS` on any path: an empty 200, CORS headers are added by the caller
pub fn handle_preflight() -> GatewayResponse {
    GatewayResponse::text(200, "")
}

pub fn handle_not_found() -> GatewayResponse {
    GatewayResponse::text(404, "Not Found")
}

pub fn handle_method_not_allowed() -> GatewayResponse {
    GatewayResponse::text(405, "Method Not Allowed")
}
