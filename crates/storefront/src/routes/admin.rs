//! Admin-only handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use meridian_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Delete a user account and, by cascade, their orders.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = UserId::new(id);
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    if !UserRepository::new(state.pool()).delete(&id).await? {
        return Err(AppError::NotFound("User".to_string()));
    }

    tracing::info!(user_id = %id, "User deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
