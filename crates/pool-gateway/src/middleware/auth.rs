//! Authentication middleware for protected routes.
//!
//! Extracts Bearer token from Authorization header, verifies it against the
//! pool's verification keys, and injects claims into request extensions.

use crate::auth::{Claims, TokenVerifier};
use crate::errors::GatewayError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if token is missing or invalid
/// - Continues to next handler with claims in extensions if token is valid
#[instrument(skip(state, req, next), name = "gw.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gw.middleware.auth", "Missing Authorization header");
            GatewayError::InvalidToken("Missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "gw.middleware.auth", "Invalid Authorization header format");
        GatewayError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    let claims = state.verifier.verify(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Require membership in `group`, as listed in the token's groups claim.
///
/// # Errors
///
/// `GatewayError::Forbidden` when the caller is not a member.
pub fn require_group(claims: &Claims, group: &str) -> Result<(), GatewayError> {
    if claims.is_member_of(group) {
        return Ok(());
    }

    tracing::debug!(target: "gw.middleware.auth", required_group = %group, "Caller lacks required group");
    Err(GatewayError::Forbidden(
        "Insufficient permissions for this operation".to_string(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    // Token verification through the middleware is covered by the
    // integration tests in auth_tests.rs.

    use super::*;

    fn claims_with_groups(groups: &[&str]) -> Claims {
        Claims {
            sub: "user".to_string(),
            exp: 0,
            iat: 0,
            token_use: "access".to_string(),
            username: Some("alice".to_string()),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            client_id: None,
            scope: None,
        }
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_require_group_member() {
        assert!(require_group(&claims_with_groups(&["admin"]), "admin").is_ok());
    }

    #[test]
    fn test_require_group_non_member() {
        let result = require_group(&claims_with_groups(&["staff"]), "admin");
        assert!(matches!(result, Err(GatewayError::Forbidden(_))));

        let result = require_group(&claims_with_groups(&[]), "admin");
        assert!(matches!(result, Err(GatewayError::Forbidden(_))));
    }
}
