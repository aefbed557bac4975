// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::triage::Urgency;
use shared_store::{Document, StoreError};

// =====================================================================================
// SLOTS & CLINICS
// =====================================================================================

/// A discrete bookable time label within a clinic's day, e.g. `"09:00"`.
/// Slots are compared as opaque labels; their order is the order the clinic
/// configured them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlot(String);

impl TimeSlot {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TimeSlot {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    /// Configured slot sequence; availability preserves this order.
    pub slots: Vec<TimeSlot>,
}

impl Document for Clinic {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Availability for one clinic and date. An exhausted day offers the
/// waiting list instead of slots.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotAvailability {
    Open(Vec<TimeSlot>),
    WaitingList,
}

// =====================================================================================
// APPOINTMENTS
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Whether an appointment in this status still occupies its slot.
    /// Cancelling or completing releases the slot for rebooking.
    pub fn holds_slot(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_age: i32,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub symptoms: String,
    pub urgency: Urgency,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    /// `None` for waiting-list entries.
    pub slot: Option<TimeSlot>,
    pub waiting_list: bool,
    pub payment_status: PaymentStatus,
    pub consultation_fee: Option<f64>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment holds the given clinic/date/slot spot.
    pub fn occupies(&self, clinic_id: &str, date: NaiveDate, slot: &TimeSlot) -> bool {
        self.clinic_id == clinic_id
            && self.scheduled_date == date
            && self.status.holds_slot()
            && self.slot.as_ref() == Some(slot)
    }
}

impl Document for Appointment {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

// =====================================================================================
// REQUESTS & QUERIES
// =====================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub clinic_id: String,
    pub patient_name: String,
    pub patient_age: i32,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub symptoms: String,
    pub urgency: Urgency,
    pub scheduled_date: NaiveDate,
    pub slot: Option<TimeSlot>,
    /// Explicit opt-in when no slot is requested (exhausted day).
    #[serde(default)]
    pub join_waiting_list: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// Search criteria; absent fields match everything, present fields must all
/// hold at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub urgency: Option<Urgency>,
    pub date: Option<NaiveDate>,
    pub clinic_id: Option<String>,
    pub patient_id: Option<String>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(urgency) = self.urgency {
            if appointment.urgency != urgency {
                return false;
            }
        }
        if let Some(date) = self.date {
            if appointment.scheduled_date != date {
                return false;
            }
        }
        if let Some(clinic_id) = &self.clinic_id {
            if &appointment.clinic_id != clinic_id {
                return false;
            }
        }
        if let Some(patient_id) = &self.patient_id {
            if &appointment.patient_id != patient_id {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub waiting_list: usize,
    pub high_urgency: usize,
}

// =====================================================================================
// ERRORS
// =====================================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment validation failed: {}", .violations.join("; "))]
    Validation { violations: Vec<String> },

    #[error("Slot {slot} on {date} at clinic {clinic_id} is already booked")]
    SlotConflict {
        clinic_id: String,
        date: NaiveDate,
        slot: TimeSlot,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Clinic not found: {0}")]
    ClinicNotFound(String),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        if let StoreError::NotFound { ref id, .. } = err {
            if let Ok(uuid) = id.parse() {
                return AppointmentError::NotFound(uuid);
            }
        }
        AppointmentError::Store(err)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::Validation { violations } => AppError::Validation { violations },
            AppointmentError::SlotConflict { .. } | AppointmentError::InvalidTransition { .. } => {
                AppError::Conflict(message)
            }
            AppointmentError::NotFound(_) | AppointmentError::ClinicNotFound(_) => {
                AppError::NotFound(message)
            }
            AppointmentError::Store(_) => AppError::Database(message),
        }
    }
}
