//! Admin-only routes. Reached only through the admin role gate.

use std::sync::Arc;

use axum::{Json, extract::Extension};

use gatehouse_auth::UserRecord;

use crate::app::AppState;
use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    let users = state.directory.list_users().await?;
    tracing::info!(admin = principal.email(), count = users.len(), "listed users");
    Ok(Json(users))
}
