// libs/auth-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use role_directory_cell::RoleDirectoryService;
use shared_config::AppConfig;

use crate::handlers;
use crate::services::session::SessionService;

#[derive(Clone)]
pub struct AuthCellState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionService,
    pub roles: RoleDirectoryService,
}

/// Cookie session endpoints. These are what the login page talks to, so
/// they sit outside the bearer-token middleware.
pub fn auth_routes(state: AuthCellState) -> Router {
    Router::new()
        .route("/setToken", post(handlers::set_token))
        .route("/logout", post(handlers::logout))
        .route("/session", get(handlers::get_session))
        .with_state(state)
}
