// libs/call-session-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CallerIdentity, InitiateCallRequest};
use crate::router::CallCellState;
use crate::services::token::RtcRole;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(rename = "channelName")]
    pub channel_name: Option<String>,
    pub uid: Option<String>,
    pub role: Option<String>,
}

// ==============================================================================
// TOKEN HANDLER
// ==============================================================================

/// Issues a media credential for a channel. Each missing query parameter is
/// its own 400 naming the parameter, so clients can fix requests one field
/// at a time.
pub async fn generate_rtc_token(
    State(state): State<CallCellState>,
    Query(params): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    let channel_name = params
        .channel_name
        .ok_or_else(|| AppError::BadRequest("channelName is required".to_string()))?;
    let uid = params
        .uid
        .ok_or_else(|| AppError::BadRequest("uid is required".to_string()))?;
    let role = params
        .role
        .ok_or_else(|| AppError::BadRequest("role is required".to_string()))?;

    let token = state
        .tokens
        .issue(&channel_name, &uid, RtcRole::from_param(&role), Utc::now())?;
    Ok(Json(json!({
        "token": token.token,
        "expires_at": token.expires_at,
    })))
}

// ==============================================================================
// CALL SESSION HANDLERS
// ==============================================================================

/// Places the signed-in patient into the waiting queue and hands back the
/// channel they will be met on.
#[axum::debug_handler]
pub async fn initiate_call(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<InitiateCallRequest>,
) -> Result<Json<Value>, AppError> {
    let identity = CallerIdentity::from(&user);
    let session = state.calls.initiate(Some(identity), request).await?;
    Ok(Json(json!({
        "success": true,
        "session": session,
    })))
}

pub async fn waiting_calls(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let acting = state.roles.role_of(&user.id).await;
    if !acting.can_work_reception() {
        return Err(AppError::Auth("The call queue is staff only".to_string()));
    }

    let sessions = state.calls.waiting_sessions().await;
    let count = sessions.len();
    Ok(Json(json!({
        "sessions": sessions,
        "count": count,
    })))
}

pub async fn get_call(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
    Path(channel_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = state.calls.get(&channel_name).await?;

    // Callers see their own session; the directory decides who else may.
    if session.patient_id != user.id {
        let acting = state.roles.role_of(&user.id).await;
        if !acting.can_work_reception() {
            return Err(AppError::Auth(
                "Not permitted to view this call".to_string(),
            ));
        }
    }

    Ok(Json(json!({ "session": session })))
}

/// Answers a waiting call. Answering twice is harmless; the second request
/// sees the already-active session.
#[axum::debug_handler]
pub async fn activate_call(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
    Path(channel_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let acting = state.roles.role_of(&user.id).await;
    if !acting.can_work_reception() {
        return Err(AppError::Auth(
            "Answering calls is staff only".to_string(),
        ));
    }

    let session = state.calls.mark_active(&channel_name).await?;
    Ok(Json(json!({
        "success": true,
        "session": session,
    })))
}

/// Hangs up a call. Either side may end it, and ending an already-ended
/// call simply returns the session as it stands.
#[axum::debug_handler]
pub async fn end_call(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
    Path(channel_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = state.calls.get(&channel_name).await?;

    if session.patient_id != user.id {
        let acting = state.roles.role_of(&user.id).await;
        if !acting.can_work_reception() {
            return Err(AppError::Auth(
                "Not permitted to end this call".to_string(),
            ));
        }
    }

    let session = state.calls.end(&channel_name).await?;
    Ok(Json(json!({
        "success": true,
        "session": session,
    })))
}

/// Runs one sweep of the waiting queue on demand. The background sweeper
/// does this on a cadence; the endpoint exists for admins to force a pass.
#[axum::debug_handler]
pub async fn sweep_calls(
    State(state): State<CallCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let acting = state.roles.role_of(&user.id).await;
    if !acting.can_manage_roles() {
        return Err(AppError::Auth(
            "Sweeping the call queue is admin only".to_string(),
        ));
    }

    let expiry = chrono::Duration::minutes(state.config.call_expiry_minutes);
    let outcome = state.calls.sweep_expired(Utc::now(), expiry).await?;
    Ok(Json(json!({
        "success": true,
        "examined": outcome.examined,
        "swept": outcome.swept,
    })))
}
