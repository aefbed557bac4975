// libs/role-directory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::directory::RoleDirectoryService;

#[derive(Clone)]
pub struct RoleCellState {
    pub config: Arc<AppConfig>,
    pub directory: RoleDirectoryService,
}

pub fn role_routes(state: RoleCellState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_my_role))
        .route("/{user_id}", get(handlers::get_role))
        .route("/{user_id}", put(handlers::set_role))
        .route("/{user_id}/force-logout", post(handlers::force_logout))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
