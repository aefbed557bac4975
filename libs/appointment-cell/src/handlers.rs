// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentFilter, AppointmentStatus, BookAppointmentRequest, SlotAvailability,
    UpdateStatusRequest,
};
use crate::router::AppointmentCellState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub clinic_id: Option<String>,
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// BOOKING & AVAILABILITY HANDLERS
// ==============================================================================

/// Books an appointment for the signed-in patient. Validation problems come
/// back all at once as a 400 with the full violation list; a lost slot race
/// is a 409.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.bookings.book(&user.id, request).await?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

pub async fn get_availability(
    State(state): State<AppointmentCellState>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = params.clinic_id.ok_or_else(|| {
        AppError::BadRequest("Missing required query parameter: clinic_id".to_string())
    })?;
    let date = params.date.ok_or_else(|| {
        AppError::BadRequest("Missing required query parameter: date".to_string())
    })?;

    let body = match state.bookings.availability(&clinic_id, date).await? {
        SlotAvailability::Open(slots) => json!({
            "clinic_id": clinic_id,
            "date": date,
            "waiting_list": false,
            "slots": slots,
        }),
        SlotAvailability::WaitingList => json!({
            "clinic_id": clinic_id,
            "date": date,
            "waiting_list": true,
            "slots": [],
        }),
    };
    Ok(Json(body))
}

pub async fn list_clinics(
    State(state): State<AppointmentCellState>,
) -> Result<Json<Value>, AppError> {
    let clinics = state.clinics.list().await;
    Ok(Json(json!({ "clinics": clinics })))
}

// ==============================================================================
// LIFECYCLE & REVIEW HANDLERS
// ==============================================================================

pub async fn get_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.bookings.get(appointment_id).await?;

    // Owners see their own booking; anything else is staff work, decided by
    // the live directory rather than the token's role claim.
    if appointment.patient_id != user.id {
        let acting = state.roles.role_of(&user.id).await;
        if !acting.can_work_reception() {
            return Err(AppError::Auth(
                "Not permitted to view this appointment".to_string(),
            ));
        }
    }

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn search_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Query(mut filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    // Patients only ever see their own bookings, whatever the query asks.
    let acting = state.roles.role_of(&user.id).await;
    if !acting.can_work_reception() {
        filter.patient_id = Some(user.id.clone());
    }

    let appointments = state.bookings.search(&filter).await;
    let count = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "count": count,
    })))
}

/// Moves an appointment through its lifecycle. Patients may cancel their own
/// booking; confirming and completing are staff actions.
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.bookings.get(appointment_id).await?;

    let own_cancellation =
        appointment.patient_id == user.id && request.status == AppointmentStatus::Cancelled;
    if !own_cancellation {
        let acting = state.roles.role_of(&user.id).await;
        if !acting.can_work_reception() {
            return Err(AppError::Auth(
                "Not permitted to change this appointment".to_string(),
            ));
        }
    }

    let updated = state
        .bookings
        .transition(appointment_id, request.status)
        .await?;
    Ok(Json(json!({
        "success": true,
        "appointment": updated,
    })))
}

pub async fn get_stats(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let acting = state.roles.role_of(&user.id).await;
    if !acting.can_work_reception() {
        return Err(AppError::Auth(
            "Appointment statistics are staff only".to_string(),
        ));
    }

    let stats = state.bookings.stats().await;
    Ok(Json(json!({ "stats": stats })))
}
