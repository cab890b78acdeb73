//! HTTP routes for the Pool Gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenVerifier;
use crate::config::{Config, REQUEST_TIMEOUT};
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::DirectoryService;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Directory operations on the user pool.
    pub directory: Arc<DirectoryService>,

    /// Token verifier built from the pool's key set.
    pub verifier: Arc<TokenVerifier>,

    /// Cancelled on the shutdown signal. Readiness reports draining while
    /// requests keep being served.
    pub draining: CancellationToken,

    /// Cancelled once the drain period ends. In-flight listings stop.
    pub shutdown: CancellationToken,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public, unversioned
/// - `/ready` - Readiness probe - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/me` - Current caller's claims
/// - `/api/v1/groups`, `/api/v1/groups/:group/users` - Group listings
/// - `/api/v1/users`, `/api/v1/users/:username` - User listings and lookup
/// - `/api/v1/groups/:group/users/:username` - Membership changes (admin group only)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: Arc::clone(&state.verifier),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route("/api/v1/groups", get(handlers::list_groups))
        .route("/api/v1/groups/:group/users", get(handlers::list_group_members))
        .route(
            "/api/v1/groups/:group/users/:username",
            put(handlers::add_group_member).delete(handlers::remove_group_member),
        )
        .route("/api/v1/users", get(handlers::list_users))
        .route("/api/v1/users/:username", get(handlers::get_user))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (outermost first):
    // 1. http_metrics_middleware - Record ALL responses, including 408s
    // 2. TimeoutLayer - Bound the request, trace span included
    // 3. TraceLayer - Log request details (innermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
