//! Pool Gateway Library
//!
//! A thin HTTP façade over a managed identity provider (an AWS Cognito user
//! pool). The provider owns users, groups, credentials and tokens; the
//! gateway validates requests, translates them into provider calls, maps
//! provider errors onto HTTP responses and serializes results.
//!
//! # Architecture
//!
//! The gateway follows the Handler -> Service -> Provider pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> provider/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification and claims
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `jwks` - Key set fetching and RSA key conversion
//! - `listing` - Paginated listing with throttling backoff
//! - `middleware` - Authentication and HTTP metrics layers
//! - `models` - Directory records and API types
//! - `observability` - Metrics definitions
//! - `provider` - Identity provider trait, Cognito implementation, error table
//! - `routes` - Axum router setup
//! - `services` - Directory operations built on the provider

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod jwks;
pub mod listing;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod provider;
pub mod routes;
pub mod services;
