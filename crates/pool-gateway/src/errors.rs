//! Pool Gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking provider details. Actual errors are logged server-side.

use crate::listing::{IncompleteAggregate, ListingError};
use crate::provider::{ErrorKind, ProviderError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Pool Gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - RateLimitExceeded: 429 Too Many Requests
/// - Forbidden: 403 Forbidden
/// - BadRequest: 400 Bad Request
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidToken(_) => 401,
            GatewayError::NotFound(_) => 404,
            GatewayError::Conflict(_) => 409,
            GatewayError::RateLimitExceeded => 429,
            GatewayError::Forbidden(_) => 403,
            GatewayError::BadRequest(_) => 400,
            GatewayError::ServiceUnavailable(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            GatewayError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            GatewayError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            GatewayError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            GatewayError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            GatewayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            GatewayError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gw.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"pool-gateway\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Map provider failures onto HTTP errors.
///
/// The vendor message is logged here and never returned to the client.
impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!(
            target: "gw.provider",
            operation = err.operation,
            kind = %err.kind,
            code = err.code.as_deref().unwrap_or("none"),
            message = %err.message,
            "Provider call failed"
        );

        match err.kind {
            ErrorKind::Throttled => GatewayError::RateLimitExceeded,
            ErrorKind::NotFound => GatewayError::NotFound("Resource not found".to_string()),
            ErrorKind::PermissionDenied => {
                GatewayError::Forbidden("Operation not permitted".to_string())
            }
            ErrorKind::InvalidParameter => {
                GatewayError::BadRequest("Invalid request parameters".to_string())
            }
            ErrorKind::AlreadyExists => {
                GatewayError::Conflict("Resource already exists".to_string())
            }
            ErrorKind::Internal | ErrorKind::Unavailable | ErrorKind::Unknown => {
                GatewayError::ServiceUnavailable(format!("Identity provider error: {err}"))
            }
        }
    }
}

impl From<ListingError> for GatewayError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::Provider(source) | ListingError::RetriesExhausted { last: source, .. } => {
                GatewayError::from(source)
            }
            ListingError::Cancelled => {
                GatewayError::ServiceUnavailable("Listing cancelled".to_string())
            }
        }
    }
}

/// A partial listing is never returned to HTTP clients.
impl<T> From<IncompleteAggregate<T>> for GatewayError {
    fn from(err: IncompleteAggregate<T>) -> Self {
        tracing::warn!(
            target: "gw.listing",
            partial_count = err.partial.len(),
            cause = %err.cause,
            "Listing stopped before exhausting all pages"
        );
        GatewayError::from(err.cause)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn provider_error(kind: ErrorKind) -> ProviderError {
        ProviderError::new("list_groups", kind, "vendor detail")
    }

    #[test]
    fn test_display_invalid_token() {
        let error = GatewayError::InvalidToken("expired".to_string());
        assert_eq!(format!("{}", error), "Invalid token: expired");
    }

    #[test]
    fn test_display_not_found() {
        let error = GatewayError::NotFound("user".to_string());
        assert_eq!(format!("{}", error), "Not found: user");
    }

    #[test]
    fn test_display_rate_limit() {
        let error = GatewayError::RateLimitExceeded;
        assert_eq!(format!("{}", error), "Rate limit exceeded");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::InvalidToken("test".to_string()).status_code(), 401);
        assert_eq!(GatewayError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(GatewayError::Conflict("test".to_string()).status_code(), 409);
        assert_eq!(GatewayError::RateLimitExceeded.status_code(), 429);
        assert_eq!(GatewayError::Forbidden("test".to_string()).status_code(), 403);
        assert_eq!(GatewayError::BadRequest("test".to_string()).status_code(), 400);
        assert_eq!(
            GatewayError::ServiceUnavailable("test".to_string()).status_code(),
            503
        );
    }

    #[test]
    fn test_provider_error_mapping() {
        let cases = [
            (ErrorKind::Throttled, 429),
            (ErrorKind::NotFound, 404),
            (ErrorKind::PermissionDenied, 403),
            (ErrorKind::InvalidParameter, 400),
            (ErrorKind::AlreadyExists, 409),
            (ErrorKind::Internal, 503),
            (ErrorKind::Unavailable, 503),
            (ErrorKind::Unknown, 503),
        ];

        for (kind, expected) in cases {
            let err = GatewayError::from(provider_error(kind));
            assert_eq!(err.status_code(), expected, "kind {kind}");
        }
    }

    #[test]
    fn test_incomplete_aggregate_maps_through_cause() {
        let err = IncompleteAggregate {
            partial: vec![1, 2, 3],
            cause: ListingError::RetriesExhausted {
                retries: 3,
                last: provider_error(ErrorKind::Throttled),
            },
        };
        assert!(matches!(
            GatewayError::from(err),
            GatewayError::RateLimitExceeded
        ));

        let err: IncompleteAggregate<u8> = IncompleteAggregate {
            partial: vec![],
            cause: ListingError::Cancelled,
        };
        assert_eq!(GatewayError::from(err).status_code(), 503);
    }

    #[tokio::test]
    async fn test_into_response_invalid_token() {
        let error = GatewayError::InvalidToken("token expired".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Check WWW-Authenticate header
        let www_auth = response.headers().get("WWW-Authenticate");
        assert!(www_auth.is_some());
        let www_auth_str = www_auth.unwrap().to_str().unwrap();
        assert!(www_auth_str.contains("Bearer realm=\"pool-gateway\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body_json["error"]["message"], "token expired");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let error = GatewayError::NotFound("User not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "User not found");
    }

    #[tokio::test]
    async fn test_into_response_rate_limit() {
        let error = GatewayError::RateLimitExceeded;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable_hides_detail() {
        let error = GatewayError::from(provider_error(ErrorKind::Internal));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "SERVICE_UNAVAILABLE");
        // Generic message returned to client
        assert_eq!(
            body_json["error"]["message"],
            "Service temporarily unavailable"
        );
        assert!(!body_json.to_string().contains("vendor detail"));
    }
}
