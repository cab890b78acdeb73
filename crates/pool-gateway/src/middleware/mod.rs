//! Middleware for the Pool Gateway.
//!
//! # Components
//!
//! - `auth` - Bearer token verification for protected routes
//! - `http_metrics` - Request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, require_group, AuthState};
pub use http_metrics::http_metrics_middleware;
