//! User handlers.

use crate::errors::GatewayError;
use crate::models::{validate_identifier, ListResponse, UserSummary};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/users
///
/// Returns every user in the pool.
#[instrument(skip_all, name = "gw.handlers.list_users")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse<UserSummary>>, GatewayError> {
    let cancel = state.shutdown.child_token();
    let users = state.directory.list_users(&cancel).await?;

    tracing::debug!(target: "gw.handlers.users", count = users.len(), "Listed users");
    Ok(Json(ListResponse::from(users)))
}

/// Handler for GET /api/v1/users/:username
#[instrument(skip_all, name = "gw.handlers.get_user")]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserSummary>, GatewayError> {
    validate_identifier("username", &username)?;

    let user = state.directory.get_user(&username).await?;
    Ok(Json(user))
}
