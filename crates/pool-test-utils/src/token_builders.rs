//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating pool-style token claims.

use crate::crypto_fixtures::{sign_token, TEST_ISSUER};
use chrono::{Duration, Utc};
use serde_json::json;

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .in_group("admin")
///     .expires_in(3600)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    username: String,
    groups: Vec<String>,
    token_use: String,
    issuer: String,
    scope: String,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "0b7e4a52-test-subject".to_string(),
            username: "test-user".to_string(),
            groups: Vec::new(),
            token_use: "access".to_string(),
            issuer: TEST_ISSUER.to_string(),
            scope: "aws.cognito.signin.user.admin".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the pool username
    pub fn for_user(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Add a group membership
    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    /// Set `token_use` ("access" or "id")
    pub fn with_token_use(mut self, token_use: &str) -> Self {
        self.token_use = token_use.to_string();
        self
    }

    /// Set the issuer
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// Set the scope (space-separated)
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> serde_json::Value {
        json!({
            "sub": self.sub,
            "iss": self.issuer,
            "token_use": self.token_use,
            "username": self.username,
            "cognito:groups": self.groups,
            "scope": self.scope,
            "client_id": "test-client",
            "exp": self.exp,
            "iat": self.iat,
        })
    }

    /// Build and sign with the primary test key
    pub fn sign(self) -> String {
        sign_token(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
