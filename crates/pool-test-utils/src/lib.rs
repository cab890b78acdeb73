//! # Pool Gateway Test Utilities
//!
//! Shared test utilities for the Pool Gateway.
//!
//! This crate provides:
//! - Fixed RSA key material and JWKS documents (`crypto_fixtures`)
//! - Token claim builders (`TestTokenBuilder`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pool_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestGatewayServer::spawn(Arc::new(ScriptedProvider::new())).await?;
//!     let token = TestTokenBuilder::new().for_user("alice").sign();
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
