use tracing::info;

use shared_config::AppConfig;
use shared_store::{Collection, StoreError};

use crate::models::{AppointmentError, Clinic, TimeSlot};

#[derive(Clone)]
pub struct ClinicRegistry {
    clinics: Collection<Clinic>,
}

impl ClinicRegistry {
    pub fn new(clinics: Collection<Clinic>) -> Self {
        Self { clinics }
    }

    /// The clinic every deployment starts with; its slot sequence comes
    /// from configuration.
    pub fn default_clinic(config: &AppConfig) -> Clinic {
        Clinic {
            id: "clinic-main".to_string(),
            name: "CareLink Main Clinic".to_string(),
            slots: config
                .default_clinic_slots
                .iter()
                .map(|label| TimeSlot::from(label.as_str()))
                .collect(),
        }
    }

    /// Registers or replaces a clinic.
    pub async fn register(&self, clinic: Clinic) -> Result<Clinic, AppointmentError> {
        match self.clinics.insert(clinic.clone()).await {
            Ok(created) => {
                info!("Registered clinic {} with {} slots", created.id, created.slots.len());
                Ok(created)
            }
            Err(StoreError::Duplicate { .. }) => {
                let replaced = self
                    .clinics
                    .try_update(&clinic.id, |existing| {
                        *existing = clinic.clone();
                        Ok::<(), AppointmentError>(())
                    })
                    .await?;
                info!("Updated clinic {}", replaced.id);
                Ok(replaced)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, clinic_id: &str) -> Option<Clinic> {
        self.clinics.get(&clinic_id.to_string()).await
    }

    pub async fn list(&self) -> Vec<Clinic> {
        let mut all = self.clinics.list().await;
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
