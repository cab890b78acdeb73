//! Identity provider seam.
//!
//! The gateway never stores users or groups itself. Everything goes through
//! a [`DirectoryProvider`], which translates calls into the managed user-pool
//! API and reports failures as [`ProviderError`] values carrying a local
//! [`ErrorKind`].
//!
//! # Components
//!
//! - `cognito` - AWS Cognito user-pool implementation
//! - `error_map` - Vendor error code to `ErrorKind` lookup table
//! - `mock` - Scripted provider for tests

pub mod cognito;
pub mod error_map;
pub mod mock;

use crate::models::{GroupSummary, UserSummary};
use std::fmt;
use thiserror::Error;

pub use cognito::CognitoProvider;
pub use error_map::classify;

/// Local classification of provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider rejected the call due to rate limiting.
    Throttled,
    /// User, group, or pool does not exist.
    NotFound,
    /// Caller credentials are not allowed to perform the operation.
    PermissionDenied,
    /// Provider rejected the request parameters.
    InvalidParameter,
    /// Resource already exists.
    AlreadyExists,
    /// Provider reported an internal failure.
    Internal,
    /// Provider could not be reached (dispatch failure, timeout).
    Unavailable,
    /// Error code not present in the lookup table.
    Unknown,
}

impl ErrorKind {
    /// Whether the listing backoff may retry this failure.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Throttled)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Throttled => "throttled",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Internal => "internal",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct ProviderError {
    /// Local classification.
    pub kind: ErrorKind,

    /// Vendor error code, when the provider returned one.
    pub code: Option<String>,

    /// Provider operation that failed (bounded set, used as a metric label).
    pub operation: &'static str,

    /// Human-readable detail. Logged server-side only.
    pub message: String,
}

impl ProviderError {
    /// Build an error from a vendor code, classifying it through the lookup table.
    pub fn from_code(operation: &'static str, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind: classify(code),
            code: code.map(str::to_string),
            operation,
            message: message.into(),
        }
    }

    /// Build an error with an explicit kind and no vendor code.
    pub fn new(operation: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            operation,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Input of one paginated provider list call.
///
/// Identifies the collection (pool and, for membership listings, the group)
/// plus the continuation cursor. Only `cursor` changes between calls of one
/// traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    /// User pool identifier.
    pub pool_id: String,

    /// Group name for membership listings.
    pub group: Option<String>,

    /// Provider continuation token; `None` requests the first page.
    pub cursor: Option<String>,
}

impl ListingRequest {
    /// Request for a pool-wide collection (users or groups).
    pub fn pool(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            group: None,
            cursor: None,
        }
    }

    /// Request for the members of one group.
    pub fn group_members(pool_id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            group: Some(group.into()),
            cursor: None,
        }
    }
}

/// One page returned by a provider list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records in provider return order.
    pub items: Vec<T>,

    /// Cursor for the next page; `None` when the collection is exhausted.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page, treating an empty continuation token as absent.
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.filter(|cursor| !cursor.is_empty()),
        }
    }

    /// Final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Operations the gateway needs from the identity provider.
#[async_trait::async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// One page of the users belonging to `request.group`.
    async fn list_users_in_group(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<UserSummary>, ProviderError>;

    /// One page of the groups defined in the pool.
    async fn list_groups(&self, request: &ListingRequest)
        -> Result<Page<GroupSummary>, ProviderError>;

    /// One page of all users in the pool.
    async fn list_users(&self, request: &ListingRequest)
        -> Result<Page<UserSummary>, ProviderError>;

    /// Look up a single user.
    async fn get_user(&self, pool_id: &str, username: &str) -> Result<UserSummary, ProviderError>;

    /// Add a user to a group.
    async fn add_user_to_group(
        &self,
        pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError>;

    /// Remove a user from a group.
    async fn remove_user_from_group(
        &self,
        pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError>;
}
