//! Pool Gateway models.
//!
//! Contains the directory records returned by the provider and the
//! request/response types of the HTTP API.

use crate::errors::GatewayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length accepted for user and group names.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// A user as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Provider username (unique within the pool).
    pub username: String,

    /// Account status (e.g. "CONFIRMED", "FORCE_CHANGE_PASSWORD").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Whether the account is enabled.
    pub enabled: bool,

    /// Email address attribute, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// All user attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Account creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserSummary {
    /// Minimal record with only a username, enabled.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            status: None,
            enabled: true,
            email: None,
            attributes: BTreeMap::new(),
            created_at: None,
        }
    }
}

/// A group as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group name (unique within the pool).
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Precedence used by the provider when a user is in several groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedence: Option<i32>,
}

impl GroupSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            precedence: None,
        }
    }
}

/// Collection response for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Number of items returned.
    pub count: usize,

    /// All records, in provider order.
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Liveness response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy").
    pub status: String,

    /// Provider region.
    pub region: String,
}

/// Readiness response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "draining".
    pub status: String,

    /// Number of token verification keys loaded at startup.
    pub verification_keys: usize,
}

/// Validate a user or group name taken from a request path.
///
/// Names must be non-empty, at most [`MAX_IDENTIFIER_LENGTH`] characters,
/// and contain no control characters or `/`.
///
/// # Errors
///
/// Returns `GatewayError::BadRequest` naming the offending field.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::BadRequest(format!("{field} must not be empty")));
    }

    if value.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(GatewayError::BadRequest(format!(
            "{field} must be at most {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }

    if value.chars().any(|c| c.is_control() || c == '/') {
        return Err(GatewayError::BadRequest(format!(
            "{field} contains invalid characters"
        )));
    }

    Ok(())
}
