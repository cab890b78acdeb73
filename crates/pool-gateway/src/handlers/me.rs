//! Current caller handler.
//!
//! Returns information about the authenticated caller from token claims.

use crate::auth::Claims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/api/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject (user or client ID).
    pub sub: String,

    /// Pool username, absent for client-credentials tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Pool groups the caller belongs to.
    pub groups: Vec<String>,

    /// Token scopes.
    pub scopes: Vec<String>,

    /// "access" or "id".
    pub token_use: String,

    /// Token expiration timestamp.
    pub exp: i64,

    /// Token issued-at timestamp.
    pub iat: i64,
}

impl From<Claims> for MeResponse {
    fn from(claims: Claims) -> Self {
        let scopes = claims.scopes().iter().map(|s| s.to_string()).collect();

        Self {
            sub: claims.sub,
            username: claims.username,
            groups: claims.groups,
            scopes,
            token_use: claims.token_use,
            exp: claims.exp,
            iat: claims.iat,
        }
    }
}

/// Handler for GET /api/v1/me
///
/// ## Response
///
/// ```json
/// {
///   "sub": "3f1c9a2e-...",
///   "username": "alice",
///   "groups": ["admins"],
///   "scopes": ["openid", "profile"],
///   "token_use": "access",
///   "exp": 1234567890,
///   "iat": 1234567800
/// }
/// ```
#[instrument(skip_all, name = "gw.handlers.me")]
pub async fn get_me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    tracing::debug!(target: "gw.handlers.me", "Returning caller claims");
    Json(MeResponse::from(claims))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims {
            sub: "user123".to_string(),
            exp: 1234567890,
            iat: 1234567800,
            token_use: "access".to_string(),
            username: Some("alice".to_string()),
            groups: vec!["admins".to_string()],
            client_id: Some("client".to_string()),
            scope: Some("openid profile".to_string()),
        }
    }

    #[test]
    fn test_me_response_from_claims() {
        let response = MeResponse::from(claims());

        assert_eq!(response.sub, "user123");
        assert_eq!(response.username.as_deref(), Some("alice"));
        assert_eq!(response.groups, vec!["admins"]);
        assert_eq!(response.scopes, vec!["openid", "profile"]);
        assert_eq!(response.token_use, "access");
    }

    #[test]
    fn test_me_response_serialization() {
        let json = serde_json::to_string(&MeResponse::from(claims())).unwrap();

        assert!(json.contains("\"sub\":\"user123\""));
        assert!(json.contains("\"username\":\"alice\""));
        assert!(json.contains("\"scopes\":[\"openid\",\"profile\"]"));
        assert!(json.contains("\"exp\":1234567890"));
        assert!(json.contains("\"iat\":1234567800"));
    }

    #[test]
    fn test_me_response_without_username() {
        let mut claims = claims();
        claims.username = None;
        claims.scope = None;

        let json = serde_json::to_string(&MeResponse::from(claims)).unwrap();

        assert!(
            !json.contains("username"),
            "username should be omitted when None"
        );
        assert!(json.contains("\"scopes\":[]"));
    }
}
