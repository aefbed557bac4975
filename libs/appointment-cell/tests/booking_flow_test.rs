use assert_matches::assert_matches;
use chrono::NaiveDate;

use appointment_cell::{
    Appointment, AppointmentBookingService, AppointmentError, AppointmentFilter,
    AppointmentStatus, BookAppointmentRequest, Clinic, ClinicRegistry, PaymentStatus,
    SlotAvailability, TimeSlot,
};
use shared_models::triage::Urgency;
use shared_store::Collection;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

async fn service_with_slots(labels: &[&str]) -> AppointmentBookingService {
    let clinics = ClinicRegistry::new(Collection::<Clinic>::new("clinics"));
    clinics
        .register(Clinic {
            id: "clinic-main".to_string(),
            name: "CareLink Main Clinic".to_string(),
            slots: labels.iter().map(|l| TimeSlot::from(*l)).collect(),
        })
        .await
        .unwrap();
    AppointmentBookingService::new(Collection::<Appointment>::new("appointments"), clinics)
}

fn request(slot: Option<&str>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        clinic_id: "clinic-main".to_string(),
        patient_name: "Asha Nair".to_string(),
        patient_age: 34,
        patient_phone: Some("9876543210".to_string()),
        patient_email: Some("asha@example.com".to_string()),
        symptoms: "persistent cough".to_string(),
        urgency: Urgency::Medium,
        scheduled_date: date(),
        slot: slot.map(TimeSlot::from),
        join_waiting_list: false,
    }
}

// =====================================================================================
// BOOKING
// =====================================================================================

#[tokio::test]
async fn booking_a_valid_request_creates_a_pending_appointment() {
    let service = service_with_slots(&["09:00", "10:00", "11:00"]).await;

    let appointment = service.book("u123", request(Some("10:00"))).await.unwrap();

    assert_eq!(appointment.patient_id, "u123");
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.payment_status, PaymentStatus::Pending);
    assert_eq!(appointment.slot, Some(TimeSlot::from("10:00")));
    assert!(!appointment.waiting_list);
    assert_eq!(appointment.created_at, appointment.updated_at);
}

#[tokio::test]
async fn concurrent_bookings_of_one_slot_admit_exactly_one_patient() {
    let service = service_with_slots(&["09:00", "10:00", "11:00"]).await;

    let mut tasks = Vec::new();
    for i in 0..6 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.book(&format!("p{i}"), request(Some("11:00"))).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppointmentError::SlotConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 5);
    assert_eq!(service.search(&AppointmentFilter::default()).await.len(), 1);
}

#[tokio::test]
async fn validation_reports_every_problem_at_once() {
    let service = service_with_slots(&["09:00"]).await;

    let broken = BookAppointmentRequest {
        clinic_id: "nowhere".to_string(),
        patient_name: "   ".to_string(),
        patient_age: 0,
        patient_phone: Some("12345".to_string()),
        patient_email: Some("not-an-email".to_string()),
        symptoms: "".to_string(),
        urgency: Urgency::Low,
        scheduled_date: date(),
        slot: None,
        join_waiting_list: false,
    };

    let err = service.book("u1", broken).await.unwrap_err();
    let violations = assert_matches!(err, AppointmentError::Validation { violations } => violations);

    assert_eq!(violations.len(), 7);
    assert!(violations.iter().any(|v| v.contains("name")));
    assert!(violations.iter().any(|v| v.contains("age")));
    assert!(violations.iter().any(|v| v.contains("Symptoms")));
    assert!(violations.iter().any(|v| v.contains("Phone")));
    assert!(violations.iter().any(|v| v.contains("Email")));
    assert!(violations.iter().any(|v| v.contains("waiting list")));
    assert!(violations.iter().any(|v| v.contains("Unknown clinic")));

    // Nothing was stored for a rejected draft.
    assert!(service.search(&AppointmentFilter::default()).await.is_empty());
}

#[tokio::test]
async fn a_slot_the_clinic_does_not_offer_is_rejected() {
    let service = service_with_slots(&["09:00", "10:00"]).await;

    let err = service.book("u1", request(Some("23:59"))).await.unwrap_err();
    let violations = assert_matches!(err, AppointmentError::Validation { violations } => violations);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("not offered"));
}

#[tokio::test]
async fn a_full_day_books_onto_the_waiting_list() {
    let service = service_with_slots(&["09:00", "10:00"]).await;
    service.book("p1", request(Some("09:00"))).await.unwrap();
    service.book("p2", request(Some("10:00"))).await.unwrap();

    assert_eq!(
        service.availability("clinic-main", date()).await.unwrap(),
        SlotAvailability::WaitingList
    );

    let mut overflow = request(None);
    overflow.join_waiting_list = true;
    let queued = service.book("p3", overflow).await.unwrap();

    assert!(queued.waiting_list);
    assert_eq!(queued.slot, None);
    assert_eq!(queued.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn cancelling_frees_the_slot_for_the_next_patient() {
    let service = service_with_slots(&["09:00", "10:00", "11:00"]).await;
    let first = service.book("p1", request(Some("10:00"))).await.unwrap();

    // Taken while the first booking is live.
    let err = service.book("p2", request(Some("10:00"))).await.unwrap_err();
    assert_matches!(err, AppointmentError::SlotConflict { .. });

    service.cancel(first.id).await.unwrap();
    assert_eq!(
        service.availability("clinic-main", date()).await.unwrap(),
        SlotAvailability::Open(vec![
            TimeSlot::from("09:00"),
            TimeSlot::from("10:00"),
            TimeSlot::from("11:00"),
        ])
    );

    service.book("p2", request(Some("10:00"))).await.unwrap();
}

// =====================================================================================
// LIFECYCLE
// =====================================================================================

#[tokio::test]
async fn the_happy_path_walks_pending_confirmed_completed() {
    let service = service_with_slots(&["09:00"]).await;
    let appointment = service.book("p1", request(Some("09:00"))).await.unwrap();

    let confirmed = service.confirm(appointment.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let completed = service.complete(appointment.id).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(completed.updated_at >= completed.created_at);
}

#[tokio::test]
async fn terminal_appointments_refuse_further_transitions() {
    let service = service_with_slots(&["09:00"]).await;
    let appointment = service.book("p1", request(Some("09:00"))).await.unwrap();
    service.confirm(appointment.id).await.unwrap();
    service.complete(appointment.id).await.unwrap();

    let err = service.cancel(appointment.id).await.unwrap_err();
    assert_matches!(
        err,
        AppointmentError::InvalidTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Cancelled,
        }
    );

    // The stored record was not touched by the refused transition.
    let stored = service.get(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn pending_cannot_skip_straight_to_completed() {
    let service = service_with_slots(&["09:00"]).await;
    let appointment = service.book("p1", request(Some("09:00"))).await.unwrap();

    let err = service.complete(appointment.id).await.unwrap_err();
    assert_matches!(err, AppointmentError::InvalidTransition { .. });
}

// =====================================================================================
// SEARCH & STATS
// =====================================================================================

#[tokio::test]
async fn search_filters_combine_with_and_semantics() {
    let service = service_with_slots(&["09:00", "10:00", "11:00"]).await;

    let mut urgent = request(Some("09:00"));
    urgent.urgency = Urgency::High;
    service.book("p1", urgent).await.unwrap();

    let routine = service.book("p2", request(Some("10:00"))).await.unwrap();
    service.confirm(routine.id).await.unwrap();

    let pending_high = service
        .search(&AppointmentFilter {
            status: Some(AppointmentStatus::Pending),
            urgency: Some(Urgency::High),
            ..Default::default()
        })
        .await;
    assert_eq!(pending_high.len(), 1);
    assert_eq!(pending_high[0].patient_id, "p1");

    let for_p2 = service
        .search(&AppointmentFilter {
            patient_id: Some("p2".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(for_p2.len(), 1);
    assert_eq!(for_p2[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn stats_count_statuses_waiting_list_and_urgency() {
    let service = service_with_slots(&["09:00", "10:00"]).await;

    let mut urgent = request(Some("09:00"));
    urgent.urgency = Urgency::High;
    service.book("p1", urgent).await.unwrap();

    let second = service.book("p2", request(Some("10:00"))).await.unwrap();
    service.cancel(second.id).await.unwrap();

    let mut overflow = request(None);
    overflow.join_waiting_list = true;
    service.book("p3", overflow).await.unwrap();

    let stats = service.stats().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.waiting_list, 1);
    assert_eq!(stats.high_urgency, 1);
}

// =====================================================================================
// LIVE AVAILABILITY
// =====================================================================================

#[tokio::test]
async fn availability_watch_tracks_bookings_and_cancellations() {
    let service = service_with_slots(&["09:00", "10:00", "11:00"]).await;
    let mut watch = service.watch_availability("clinic-main", date()).await.unwrap();

    assert_eq!(
        watch.next().await.unwrap(),
        SlotAvailability::Open(vec![
            TimeSlot::from("09:00"),
            TimeSlot::from("10:00"),
            TimeSlot::from("11:00"),
        ])
    );

    let booked = service.book("p1", request(Some("10:00"))).await.unwrap();
    assert_eq!(
        watch.next().await.unwrap(),
        SlotAvailability::Open(vec![TimeSlot::from("09:00"), TimeSlot::from("11:00")])
    );

    service.cancel(booked.id).await.unwrap();
    assert_eq!(
        watch.next().await.unwrap(),
        SlotAvailability::Open(vec![
            TimeSlot::from("09:00"),
            TimeSlot::from("10:00"),
            TimeSlot::from("11:00"),
        ])
    );
}

#[tokio::test]
async fn availability_watch_reports_exhaustion_as_waiting_list() {
    let service = service_with_slots(&["09:00"]).await;
    let mut watch = service.watch_availability("clinic-main", date()).await.unwrap();
    watch.next().await.unwrap();

    service.book("p1", request(Some("09:00"))).await.unwrap();
    assert_eq!(watch.next().await.unwrap(), SlotAvailability::WaitingList);
}
