//! Appointment cell: slot availability and the appointment lifecycle.
//!
//! The slot calculator is pure - availability is always the configured slot
//! sequence minus the slots held by live appointments, recomputed from
//! current data rather than cached. Creation goes through the store's
//! conditional write so two patients can never book the same clinic, date
//! and slot, no matter how the requests interleave. When a day is full the
//! cell offers the waiting list instead of a slot.

pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::booking::AppointmentBookingService;
pub use services::clinics::ClinicRegistry;
pub use services::lifecycle::AppointmentLifecycleService;
pub use services::slots::AvailabilityWatch;
pub use router::{appointment_routes, AppointmentCellState};
