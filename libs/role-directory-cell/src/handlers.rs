// libs/role-directory-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::SetRoleRequest;
use crate::router::RoleCellState;

pub async fn get_my_role(
    State(state): State<RoleCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let record = state.directory.record_of(&user.id).await;
    Ok(Json(json!({
        "user_id": record.user_id,
        "role": record.role,
    })))
}

pub async fn get_role(
    State(state): State<RoleCellState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    // Users may look themselves up; anything else is staff work.
    if user_id != user.id {
        let acting = state.directory.role_of(&user.id).await;
        if !acting.can_work_reception() {
            return Err(AppError::Auth(
                "Not permitted to view other users' roles".to_string(),
            ));
        }
    }

    let record = state.directory.record_of(&user_id).await;
    Ok(Json(json!({
        "user_id": record.user_id,
        "role": record.role,
        "updated_at": record.updated_at,
    })))
}

#[axum::debug_handler]
pub async fn set_role(
    State(state): State<RoleCellState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<Value>, AppError> {
    // The directory itself decides whether the caller is an admin; the
    // role claim inside the token is never trusted for this.
    let acting = state.directory.role_of(&user.id).await;
    if !acting.can_manage_roles() {
        return Err(AppError::Auth(
            "Only administrators can change roles".to_string(),
        ));
    }

    debug!("{} changing role of {} to {}", user.id, user_id, request.role);
    let record = state.directory.set_role(&user_id, request.role).await?;
    Ok(Json(json!({
        "user_id": record.user_id,
        "role": record.role,
        "updated_at": record.updated_at,
    })))
}

pub async fn force_logout(
    State(state): State<RoleCellState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let acting = state.directory.role_of(&user.id).await;
    if !acting.can_manage_roles() {
        return Err(AppError::Auth(
            "Only administrators can force a logout".to_string(),
        ));
    }

    let record = state.directory.request_logout(&user_id).await?;
    Ok(Json(json!({
        "user_id": record.user_id,
        "force_logout": record.force_logout,
    })))
}
