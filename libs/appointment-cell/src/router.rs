// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use role_directory_cell::RoleDirectoryService;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::booking::AppointmentBookingService;
use crate::services::clinics::ClinicRegistry;

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub bookings: AppointmentBookingService,
    pub clinics: ClinicRegistry,
    pub roles: RoleDirectoryService,
}

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/availability", get(handlers::get_availability))
        .route("/clinics", get(handlers::list_clinics))
        .route("/search", get(handlers::search_appointments))
        .route("/stats", get(handlers::get_stats))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_status))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
