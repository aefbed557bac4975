// libs/auth-cell/src/services/gate.rs
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use role_directory_cell::Role;

use crate::router::AuthCellState;
use crate::services::cookie::session_token_from_headers;

/// Gates the reception pages: a valid session cookie plus reception rights
/// in the live directory, or a `303` to the login page.
pub async fn reception_gate(
    State(state): State<AuthCellState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    gate(state, request, next, |role| role.can_work_reception()).await
}

/// Gates the admin pages on admin rights in the live directory.
pub async fn admin_gate(
    State(state): State<AuthCellState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    gate(state, request, next, |role| role.can_manage_roles()).await
}

async fn gate(
    state: AuthCellState,
    mut request: Request<Body>,
    next: Next,
    permitted: fn(Role) -> bool,
) -> Response {
    let Some(token) = session_token_from_headers(request.headers(), &state.config.session_cookie_name)
    else {
        debug!("No session cookie on {}, routing to login", request.uri().path());
        return Redirect::to("/login").into_response();
    };

    let user = match state.sessions.resolve(&token).await {
        Ok(user) => user,
        Err(e) => {
            debug!("Session rejected on {}: {}", request.uri().path(), e);
            return Redirect::to("/login").into_response();
        }
    };

    // The directory decides, never the cookie or the token's role claim.
    let role = state.roles.role_of(&user.id).await;
    if !permitted(role) {
        debug!(
            "{} ({}) lacks access to {}, routing to login",
            user.id,
            role,
            request.uri().path()
        );
        return Redirect::to("/login").into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}
