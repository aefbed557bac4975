//! Pure slot arithmetic plus the reactive availability view.

use std::collections::HashSet;

use chrono::NaiveDate;

use shared_store::{Collection, Feed, FeedEvent};

use crate::models::{Appointment, Clinic, SlotAvailability, TimeSlot};

/// Configured slots minus the ones held by live appointments for the same
/// clinic and date, in configured order. Cancelled and completed
/// appointments have released their slot and subtract nothing, as do booked
/// labels the clinic no longer offers.
pub fn available_slots(
    configured: &[TimeSlot],
    booked: &[Appointment],
    clinic_id: &str,
    date: NaiveDate,
) -> Vec<TimeSlot> {
    let taken: HashSet<&TimeSlot> = booked
        .iter()
        .filter(|a| a.clinic_id == clinic_id && a.scheduled_date == date && a.status.holds_slot())
        .filter_map(|a| a.slot.as_ref())
        .collect();

    configured
        .iter()
        .filter(|slot| !taken.contains(slot))
        .cloned()
        .collect()
}

/// Availability for one clinic and date. An empty result means the day is
/// exhausted and the caller should offer the waiting list instead.
pub fn availability(
    configured: &[TimeSlot],
    booked: &[Appointment],
    clinic_id: &str,
    date: NaiveDate,
) -> SlotAvailability {
    let open = available_slots(configured, booked, clinic_id, date);
    if open.is_empty() {
        SlotAvailability::WaitingList
    } else {
        SlotAvailability::Open(open)
    }
}

/// Reactive availability for one clinic and date: every appointment change
/// touching that pair triggers a fresh full recomputation from current
/// data. Nothing is cached across events, and dropping the watch
/// unregisters the underlying feed listener.
pub struct AvailabilityWatch {
    clinic: Clinic,
    date: NaiveDate,
    appointments: Collection<Appointment>,
    feed: Feed<Appointment>,
    primed: bool,
}

impl AvailabilityWatch {
    pub(crate) fn new(clinic: Clinic, date: NaiveDate, appointments: Collection<Appointment>) -> Self {
        Self {
            feed: appointments.watch(),
            clinic,
            date,
            appointments,
            primed: false,
        }
    }

    /// Current availability first, then a recomputed value after every
    /// relevant change.
    pub async fn next(&mut self) -> Option<SlotAvailability> {
        if !self.primed {
            self.primed = true;
            return Some(self.recompute().await);
        }

        loop {
            match self.feed.next().await? {
                FeedEvent::Changed(appointment) => {
                    if appointment.clinic_id == self.clinic.id
                        && appointment.scheduled_date == self.date
                    {
                        return Some(self.recompute().await);
                    }
                }
                FeedEvent::Resync(_) => return Some(self.recompute().await),
            }
        }
    }

    async fn recompute(&self) -> SlotAvailability {
        let booked = self.appointments.list().await;
        availability(&self.clinic.slots, &booked, &self.clinic.id, self.date)
    }
}
