//! Prometheus metrics.
//!
//! Exposed on a separate listener when `METRICS_BIND` is set. Without an
//! installed recorder every call below is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cs_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 201);
//! metrics::messages_posted_total("laundry");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Labelled by method and status only; paths carry ids and would explode
/// label cardinality.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

pub fn registrations_total() {
    metrics::counter!("registrations_total").increment(1);
}

// ============================================================================
// Content Metrics
// ============================================================================

/// Record a stored upload and its size.
pub fn uploads_stored_total(media_type: &str, size_bytes: u64) {
    metrics::counter!("uploads_stored_total",
        "media_type" => media_type.to_string()
    )
    .increment(1);
    metrics::histogram!("upload_size_bytes").record(size_bytes as f64);
}

pub fn resource_downloads_total() {
    metrics::counter!("resource_downloads_total").increment(1);
}

/// Increment posted messages counter for one category feed.
pub fn messages_posted_total(category: &str) {
    metrics::counter!("messages_posted_total",
        "category" => category.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", 200);
        http_request_duration_ms("GET", 12.5);
        login_attempts_total(false);
        registrations_total();
        uploads_stored_total("image", 2048);
        resource_downloads_total();
        messages_posted_total("laundry");
    }
}
