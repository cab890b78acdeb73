//! Per-response HTTP metrics.
//!
//! Runs outside the router and the timeout layer, so it sees every status
//! the gateway emits: handler results, auth rejections, unmatched routes and
//! the 408 produced when a request outlives its time budget. Paths are
//! normalized before they become labels so usernames and group names never
//! reach the metrics backend.

use crate::observability::metrics::record_http_request;
use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Record method, normalized path, status and latency of every response.
///
/// Server-side failures and timeouts are also logged at `gw.http`, since
/// those are the statuses a caller cannot fix by changing the request.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let method: Method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;
    let elapsed = started.elapsed();
    let status = response.status();

    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        tracing::warn!(
            target: "gw.http",
            method = %method,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request failed server-side"
        );
    }

    record_http_request(method.as_str(), &path, status.as_u16(), elapsed);

    response
}
