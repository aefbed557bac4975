// libs/auth-cell/src/handlers.rs
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;

use crate::models::SetTokenRequest;
use crate::router::AuthCellState;
use crate::services::cookie::{
    build_session_cookie, clear_session_cookie, session_token_from_headers,
};

/// Exchanges a bearer token for an HTTP-only session cookie. The page trees
/// behind the gates ride on this cookie from here on.
#[axum::debug_handler]
pub async fn set_token(
    State(state): State<AuthCellState>,
    Json(request): Json<SetTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.open_session(&request.token).await?;

    let cookie = build_session_cookie(&state.config, &session.token);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "user_id": session.user_id,
        })),
    ))
}

/// Clears the session cookie. Always succeeds: a stale or unknown cookie
/// still deserves a clean logout.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AuthCellState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = session_token_from_headers(&headers, &state.config.session_cookie_name) {
        if let Err(e) = state.sessions.close_session(&token).await {
            warn!("Logout could not close the session cleanly: {}", e);
        }
    }

    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(&state.config))]),
        Json(json!({ "success": true })),
    )
}

/// Who the session cookie belongs to, with their current directory role.
pub async fn get_session(
    State(state): State<AuthCellState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = session_token_from_headers(&headers, &state.config.session_cookie_name)
        .ok_or_else(|| AppError::Auth("No session cookie".to_string()))?;
    let user = state.sessions.resolve(&token).await?;
    let role = state.roles.role_of(&user.id).await;

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "role": role,
    })))
}
