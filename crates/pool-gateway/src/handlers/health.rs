//! Health check handlers.
//!
//! Provides health check endpoints for liveness and readiness probes.

use crate::models::{HealthResponse, ReadinessResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Liveness handler.
///
/// Always 200 while the process is serving. The provider is not called.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "region": "us-east-1"
/// }
/// ```
#[instrument(skip_all, name = "gw.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        region: state.config.region.clone(),
    })
}

/// Readiness handler.
///
/// Returns 200 with `"ready"` once verification keys are loaded, and 503
/// with `"draining"` from the shutdown signal on so load balancers stop
/// routing new traffic.
#[instrument(skip_all, name = "gw.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let verification_keys = state.verifier.key_count();

    if state.draining.is_cancelled() {
        tracing::debug!(target: "gw.health", "Readiness probe while draining");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "draining".to_string(),
                verification_keys,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            verification_keys,
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // The handlers themselves are exercised in health_tests.rs.

    #[test]
    fn test_readiness_response_serialization() {
        let response = ReadinessResponse {
            status: "draining".to_string(),
            verification_keys: 2,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "draining");
        assert_eq!(json["verification_keys"], 2);
    }
}
