//! Group handlers.
//!
//! Listings return every record or an error, never a partial page.
//! Membership changes require the configured admin group.

use crate::auth::Claims;
use crate::errors::GatewayError;
use crate::middleware::require_group;
use crate::models::{validate_identifier, GroupSummary, ListResponse, UserSummary};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/groups
#[instrument(skip_all, name = "gw.handlers.list_groups")]
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse<GroupSummary>>, GatewayError> {
    let cancel = state.shutdown.child_token();
    let groups = state.directory.list_groups(&cancel).await?;

    tracing::debug!(target: "gw.handlers.groups", count = groups.len(), "Listed groups");
    Ok(Json(ListResponse::from(groups)))
}

/// Handler for GET /api/v1/groups/:group/users
#[instrument(skip_all, name = "gw.handlers.list_group_members")]
pub async fn list_group_members(
    State(state): State<Arc<AppState>>,
    Path(group): Path<String>,
) -> Result<Json<ListResponse<UserSummary>>, GatewayError> {
    validate_identifier("group", &group)?;

    let cancel = state.shutdown.child_token();
    let members = state.directory.list_group_members(&group, &cancel).await?;

    tracing::debug!(target: "gw.handlers.groups", count = members.len(), "Listed group members");
    Ok(Json(ListResponse::from(members)))
}

/// Handler for PUT /api/v1/groups/:group/users/:username
///
/// Returns 204 No Content. Adding an existing member is not an error.
#[instrument(skip_all, name = "gw.handlers.add_group_member")]
pub async fn add_group_member(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((group, username)): Path<(String, String)>,
) -> Result<StatusCode, GatewayError> {
    require_group(&claims, &state.config.admin_group)?;
    validate_identifier("group", &group)?;
    validate_identifier("username", &username)?;

    state.directory.add_membership(&group, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/v1/groups/:group/users/:username
///
/// Returns 204 No Content.
#[instrument(skip_all, name = "gw.handlers.remove_group_member")]
pub async fn remove_group_member(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((group, username)): Path<(String, String)>,
) -> Result<StatusCode, GatewayError> {
    require_group(&claims, &state.config.admin_group)?;
    validate_identifier("group", &group)?;
    validate_identifier("username", &username)?;

    state.directory.remove_membership(&group, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
