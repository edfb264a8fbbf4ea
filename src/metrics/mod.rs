// Metrics module - Prometheus metrics for the gateway
//
// Counters and histograms live in the default prometheus registry and are
// exported in text format by the /metrics endpoint.

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

pub struct GatewayMetrics {
    /// Requests by endpoint and response status
    pub requests: IntCounterVec,

    /// End-to-end request duration by endpoint (in seconds)
    pub request_duration: HistogramVec,

    /// Cache hits
    pub cache_hits: IntCounter,

    /// Cache misses
    pub cache_misses: IntCounter,

    /// Cache backend failures (get or set)
    pub cache_errors: IntCounter,

    /// Requests rejected by the per-client rate limiter
    pub rate_limited: IntCounter,

    /// Failed source downloads
    pub upstream_failures: IntCounter,

    /// Failed requests by error kind
    pub errors: IntCounterVec,

    /// Image engine duration by output format (in seconds)
    pub transform_duration: HistogramVec,
}

static METRICS: OnceLock<GatewayMetrics> = OnceLock::new();

impl GatewayMetrics {
    /// Initialize and return the global metrics instance
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "kagami_requests_total",
                "Total number of HTTP requests by endpoint and status",
                &["endpoint", "status"]
            )
            .expect("Failed to register requests_total metric");

            let request_duration = register_histogram_vec!(
                "kagami_request_duration_seconds",
                "End-to-end request duration in seconds",
                &["endpoint"],
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register request_duration_seconds metric");

            let cache_ops = register_int_counter_vec!(
                "kagami_cache_operations_total",
                "Total number of cache operations by outcome",
                &["operation"] // hit, miss, error
            )
            .expect("Failed to register cache_operations_total metric");

            let rate_limited = register_int_counter!(
                "kagami_rate_limited_total",
                "Requests rejected by the per-client rate limiter"
            )
            .expect("Failed to register rate_limited_total metric");

            let upstream_failures = register_int_counter!(
                "kagami_upstream_failures_total",
                "Failed source image downloads"
            )
            .expect("Failed to register upstream_failures_total metric");

            let errors = register_int_counter_vec!(
                "kagami_errors_total",
                "Failed transform requests by error kind",
                &["kind"]
            )
            .expect("Failed to register errors_total metric");

            let transform_duration = register_histogram_vec!(
                "kagami_transform_duration_seconds",
                "Image decode, transform and encode duration in seconds",
                &["format"],
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            )
            .expect("Failed to register transform_duration_seconds metric");

            GatewayMetrics {
                requests,
                request_duration,
                cache_hits: cache_ops.with_label_values(&["hit"]),
                cache_misses: cache_ops.with_label_values(&["miss"]),
                cache_errors: cache_ops.with_label_values(&["error"]),
                rate_limited,
                upstream_failures,
                errors,
                transform_duration,
            }
        })
    }

    pub fn record_request(&self, endpoint: &str, status: u16, seconds: f64) {
        self.requests
            .with_label_values(&[endpoint, &status.to_string()])
            .inc();
        self.request_duration
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    pub fn record_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
    }

    /// Start timing a transform for `format`
    pub fn start_transform_timer(&self, format: &str) -> HistogramTimer {
        HistogramTimer {
            histogram: self.transform_duration.with_label_values(&[format]),
            start: Instant::now(),
        }
    }

    /// Render every registered metric in Prometheus text format
    pub fn export(&self) -> String {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// RAII timer for histogram metrics
///
/// Records the elapsed time when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
