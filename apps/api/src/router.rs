// apps/api/src/router.rs
use axum::{
    extract::Extension,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use appointment_cell::{appointment_routes, AppointmentCellState};
use auth_cell::{admin_gate, auth_routes, reception_gate, AuthCellState};
use call_session_cell::{call_routes, token_routes, CallCellState};
use role_directory_cell::{role_routes, RoleCellState};
use shared_models::auth::User;

/// Everything the router needs, one state per cell.
pub struct AppCells {
    pub appointments: AppointmentCellState,
    pub calls: CallCellState,
    pub roles: RoleCellState,
    pub auth: AuthCellState,
}

pub fn create_router(cells: AppCells) -> Router {
    Router::new()
        .route("/", get(|| async { "CareLink Clinic API is running!" }))
        .route("/health", get(health))
        .route("/login", get(login_page))
        // The token endpoint sits at the root, outside the bearer gate.
        .merge(token_routes(cells.calls.clone()))
        .nest("/api", auth_routes(cells.auth.clone()))
        .nest("/appointments", appointment_routes(cells.appointments))
        .nest("/calls", call_routes(cells.calls))
        .nest("/roles", role_routes(cells.roles))
        .nest("/reception", reception_pages(cells.auth.clone()))
        .nest("/admin", admin_pages(cells.auth))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Where the page gates send anyone without a valid session.
async fn login_page() -> Json<Value> {
    Json(json!({ "page": "login" }))
}

// The page trees serve shell payloads for the clients that render them;
// what matters here is that nothing behind these gates is reachable
// without a session cookie and the right directory role.

fn reception_pages(state: AuthCellState) -> Router {
    Router::new()
        .route("/", get(reception_dashboard))
        .layer(middleware::from_fn_with_state(state, reception_gate))
}

fn admin_pages(state: AuthCellState) -> Router {
    Router::new()
        .route("/", get(admin_dashboard))
        .layer(middleware::from_fn_with_state(state, admin_gate))
}

async fn reception_dashboard(Extension(user): Extension<User>) -> Json<Value> {
    Json(json!({ "page": "reception", "user_id": user.id }))
}

async fn admin_dashboard(Extension(user): Extension<User>) -> Json<Value> {
    Json(json!({ "page": "admin", "user_id": user.id }))
}
