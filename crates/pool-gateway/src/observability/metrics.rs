//! Metrics definitions for the Pool Gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix for the gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: ~12 values (parameterized paths)
//! - `status`: 3 values (success, error, timeout)
//! - `operation`: bounded by the provider trait (list_groups, get_user, etc.)
//! - `outcome`: `success` or an `ErrorKind` label

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gw_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500, 5.000, 15.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Provider calls include network round trips to the user pool API
        .set_buckets_for_metric(
            Matcher::Prefix("gw_provider_call".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set provider call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces user and group names with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/ready" | "/metrics" | "/api/v1/me" | "/api/v1/groups"
        | "/api/v1/users" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Normalize paths with dynamic segments
fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match parts.as_slice() {
        ["api", "v1", "users", _] => "/api/v1/users/{username}".to_string(),
        ["api", "v1", "groups", _, "users"] => "/api/v1/groups/{group}/users".to_string(),
        ["api", "v1", "groups", _, "users", _] => {
            "/api/v1/groups/{group}/users/{username}".to_string()
        }
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Provider Metrics
// ============================================================================

/// Record one call to the identity provider
///
/// Metric: `gw_provider_calls_total`, `gw_provider_call_duration_seconds`
/// Labels: `operation`, `outcome`
pub fn record_provider_call(operation: &'static str, outcome: &'static str, duration: Duration) {
    histogram!("gw_provider_call_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("gw_provider_calls_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Listing Metrics
// ============================================================================

/// Record a page appended during a listing traversal
///
/// Metric: `gw_listing_pages_total`
/// Labels: `operation`
pub fn record_listing_page(operation: &'static str) {
    counter!("gw_listing_pages_total",
        "operation" => operation
    )
    .increment(1);
}

/// Record a throttled page fetch that will be retried after a backoff delay
///
/// Metric: `gw_listing_throttle_retries_total`
/// Labels: `operation`
pub fn record_listing_throttle_retry(operation: &'static str) {
    counter!("gw_listing_throttle_retries_total",
        "operation" => operation
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a key set fetch
///
/// Metric: `gw_jwks_fetch_total`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &'static str) {
    counter!("gw_jwks_fetch_total",
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================
