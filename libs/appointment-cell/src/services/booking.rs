// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveDate, Utc};
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use shared_models::triage::Urgency;
use shared_store::{Collection, StoreError};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStats, AppointmentStatus,
    BookAppointmentRequest, Clinic, PaymentStatus, SlotAvailability,
};
use crate::services::clinics::ClinicRegistry;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::{self, AvailabilityWatch};

/// Books appointments against the shared collection and walks them through
/// their lifecycle. Slot ownership is decided inside the store's conditional
/// insert, so two patients racing for the same spot cannot both win.
#[derive(Clone)]
pub struct AppointmentBookingService {
    appointments: Collection<Appointment>,
    clinics: ClinicRegistry,
    lifecycle: AppointmentLifecycleService,
    phone_pattern: Option<Regex>,
    email_pattern: Option<Regex>,
}

impl AppointmentBookingService {
    pub fn new(appointments: Collection<Appointment>, clinics: ClinicRegistry) -> Self {
        Self {
            appointments,
            clinics,
            lifecycle: AppointmentLifecycleService::new(),
            phone_pattern: Regex::new(r"^\d{10}$").ok(),
            email_pattern: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok(),
        }
    }

    /// Books an appointment for the given patient. Every validation problem
    /// is reported in one pass rather than one at a time; a request that
    /// survives validation either takes its slot atomically or fails with
    /// [`AppointmentError::SlotConflict`].
    pub async fn book(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} at clinic {} on {}",
            patient_id, request.clinic_id, request.scheduled_date
        );

        let clinic = self.clinics.get(&request.clinic_id).await;
        let violations = self.collect_violations(&request, clinic.as_ref());
        if !violations.is_empty() {
            warn!(
                "Booking for patient {} rejected with {} validation problems",
                patient_id,
                violations.len()
            );
            return Err(AppointmentError::Validation { violations });
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            clinic_id: request.clinic_id.clone(),
            patient_id: patient_id.to_string(),
            patient_name: request.patient_name.trim().to_string(),
            patient_age: request.patient_age,
            patient_phone: request.patient_phone.clone(),
            patient_email: request.patient_email.clone(),
            symptoms: request.symptoms.trim().to_string(),
            urgency: request.urgency,
            status: AppointmentStatus::Pending,
            scheduled_date: request.scheduled_date,
            slot: request.slot.clone(),
            waiting_list: request.slot.is_none(),
            payment_status: PaymentStatus::Pending,
            consultation_fee: None,
            notes: None,
            prescription: None,
            doctor_id: None,
            duration_minutes: None,
            created_at: now,
            updated_at: now,
        };

        let created = match appointment.slot.clone() {
            Some(slot) => {
                let clinic_id = appointment.clinic_id.clone();
                let date = appointment.scheduled_date;
                let result = self
                    .appointments
                    .insert_unless(appointment, |existing| {
                        existing.occupies(&clinic_id, date, &slot)
                    })
                    .await;

                match result {
                    Ok(created) => created,
                    Err(StoreError::Conflict { .. }) => {
                        warn!(
                            "Slot {} on {} at clinic {} is already booked",
                            slot, date, clinic_id
                        );
                        return Err(AppointmentError::SlotConflict {
                            clinic_id,
                            date,
                            slot,
                        });
                    }
                    Err(other) => return Err(other.into()),
                }
            }
            // Waiting-list entries hold no slot, so there is nothing to contest.
            None => self.appointments.insert(appointment).await?,
        };

        info!(
            "Created appointment {} for patient {} ({})",
            created.id,
            created.patient_id,
            if created.waiting_list {
                "waiting list"
            } else {
                "scheduled"
            }
        );
        Ok(created)
    }

    /// Moves an appointment to a new status. The transition is validated
    /// against the current stored status under the same lock that commits
    /// the change, so a stale caller gets [`AppointmentError::InvalidTransition`]
    /// instead of silently clobbering a newer state.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let updated = self
            .appointments
            .try_update(&appointment_id, |appointment| {
                self.lifecycle
                    .validate_status_transition(appointment.status, new_status)?;
                appointment.status = new_status;
                appointment.updated_at = Utc::now();
                Ok::<(), AppointmentError>(())
            })
            .await?;

        info!("Appointment {} moved to {}", updated.id, updated.status);
        Ok(updated)
    }

    pub async fn confirm(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Completed)
            .await
    }

    /// Cancelling releases the slot; the next availability computation will
    /// offer it again.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(&appointment_id)
            .await
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    /// All appointments matching the filter, oldest first.
    pub async fn search(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let mut found = self.appointments.find(|a| filter.matches(a)).await;
        found.sort_by_key(|a| a.created_at);
        found
    }

    /// Open slots for a clinic and date, recomputed from current data on
    /// every call.
    pub async fn availability(
        &self,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<SlotAvailability, AppointmentError> {
        let clinic = self.require_clinic(clinic_id).await?;
        let booked = self.appointments.list().await;
        Ok(slots::availability(&clinic.slots, &booked, clinic_id, date))
    }

    /// Live availability: yields the current value immediately, then a fresh
    /// recomputation after every appointment change touching the clinic/date.
    pub async fn watch_availability(
        &self,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityWatch, AppointmentError> {
        let clinic = self.require_clinic(clinic_id).await?;
        Ok(AvailabilityWatch::new(
            clinic,
            date,
            self.appointments.clone(),
        ))
    }

    pub async fn stats(&self) -> AppointmentStats {
        let all = self.appointments.list().await;
        let mut stats = AppointmentStats {
            total: all.len(),
            ..Default::default()
        };
        for appointment in &all {
            match appointment.status {
                AppointmentStatus::Pending => stats.pending += 1,
                AppointmentStatus::Confirmed => stats.confirmed += 1,
                AppointmentStatus::Completed => stats.completed += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
            }
            if appointment.waiting_list {
                stats.waiting_list += 1;
            }
            if appointment.urgency == Urgency::High {
                stats.high_urgency += 1;
            }
        }
        stats
    }

    async fn require_clinic(&self, clinic_id: &str) -> Result<Clinic, AppointmentError> {
        self.clinics
            .get(clinic_id)
            .await
            .ok_or_else(|| AppointmentError::ClinicNotFound(clinic_id.to_string()))
    }

    /// Every problem with the request, not just the first one found.
    fn collect_violations(
        &self,
        request: &BookAppointmentRequest,
        clinic: Option<&Clinic>,
    ) -> Vec<String> {
        let mut violations = Vec::new();

        if request.patient_name.trim().is_empty() {
            violations.push("Patient name is required".to_string());
        }
        if request.patient_age <= 0 {
            violations.push("Patient age must be a positive number".to_string());
        }
        if request.symptoms.trim().is_empty() {
            violations.push("Symptoms description is required".to_string());
        }
        if let Some(phone) = &request.patient_phone {
            if self.phone_pattern.as_ref().is_some_and(|p| !p.is_match(phone)) {
                violations.push("Phone number must be exactly 10 digits".to_string());
            }
        }
        if let Some(email) = &request.patient_email {
            if self.email_pattern.as_ref().is_some_and(|p| !p.is_match(email)) {
                violations.push("Email address is not valid".to_string());
            }
        }
        if request.slot.is_none() && !request.join_waiting_list {
            violations.push("A slot is required unless joining the waiting list".to_string());
        }

        match clinic {
            None => violations.push(format!("Unknown clinic: {}", request.clinic_id)),
            Some(clinic) => {
                if let Some(slot) = &request.slot {
                    if !clinic.slots.contains(slot) {
                        violations.push(format!(
                            "Slot {} is not offered by clinic {}",
                            slot, clinic.id
                        ));
                    }
                }
            }
        }

        violations
    }
}
