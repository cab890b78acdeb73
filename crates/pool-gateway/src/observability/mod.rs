//! Observability module for the Pool Gateway.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
