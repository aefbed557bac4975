// libs/call-session-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use role_directory_cell::RoleDirectoryService;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::session::CallSessionService;
use crate::services::token::RtcTokenProvider;

#[derive(Clone)]
pub struct CallCellState {
    pub config: Arc<AppConfig>,
    pub calls: CallSessionService,
    pub roles: RoleDirectoryService,
    pub tokens: Arc<dyn RtcTokenProvider>,
}

pub fn call_routes(state: CallCellState) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::initiate_call))
        .route("/waiting", get(handlers::waiting_calls))
        .route("/sweep", post(handlers::sweep_calls))
        .route("/{channel_name}", get(handlers::get_call))
        .route("/{channel_name}/activate", post(handlers::activate_call))
        .route("/{channel_name}/end", post(handlers::end_call))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}

/// Credential issuance is its own gate; no bearer auth here.
pub fn token_routes(state: CallCellState) -> Router {
    Router::new()
        .route("/generate-agora-token", get(handlers::generate_rtc_token))
        .with_state(state)
}
