//! Authentication module for the Pool Gateway.
//!
//! Tokens are verified against keys resolved from the user pool's JWKS once
//! at startup (see [`crate::jwks`]).
//!
//! # Components
//!
//! - `jwt` - Token verification against the resolved key map
//! - `claims` - Claims structure for validated tokens

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{KeyLoadError, TokenVerifier};
