//! JWT claims structure.
//!
//! Contains the claims extracted from validated user-pool tokens. The `sub`
//! field is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims of a validated access or ID token.
///
/// The `sub` field identifies the user and should not be exposed in logs.
/// A custom Debug implementation redacts this field.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Token flavor: "access" or "id".
    pub token_use: String,

    /// Username. Access tokens carry `username`, ID tokens `cognito:username`.
    #[serde(default, alias = "cognito:username", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Groups the user belonged to when the token was issued.
    #[serde(default, rename = "cognito:groups", skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// App client that requested the token (access tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Space-separated OAuth scopes (access tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("token_use", &self.token_use)
            .field("username", &self.username)
            .field("groups", &self.groups)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Claims {
    /// Whether the token lists `group` in `cognito:groups`.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Get all scopes as a vector.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}
