use chrono::Utc;
use tracing::{debug, info, warn};

use shared_store::{Collection, Feed, FeedEvent, StoreError};

use crate::models::{Role, RoleDirectoryError, RoleRecord};

/// The single source of truth for who may do what. Callers must look roles
/// up here on every decision instead of trusting a cached claim; records
/// change underneath live sessions and the directory is what wins.
#[derive(Clone)]
pub struct RoleDirectoryService {
    roles: Collection<RoleRecord>,
}

impl RoleDirectoryService {
    pub fn new(roles: Collection<RoleRecord>) -> Self {
        Self { roles }
    }

    /// Creates the default patient record for a user. Idempotent; an
    /// existing record is returned untouched.
    pub async fn register(&self, user_id: &str) -> Result<RoleRecord, RoleDirectoryError> {
        if let Some(existing) = self.roles.get(&user_id.to_string()).await {
            return Ok(existing);
        }

        let record = RoleRecord::new_patient(user_id);
        match self.roles.insert(record.clone()).await {
            Ok(created) => {
                info!("Registered role record for {}", created.user_id);
                Ok(created)
            }
            // Lost a race against another login of the same user.
            Err(StoreError::Duplicate { .. }) => {
                Ok(self.roles.get(&user_id.to_string()).await.unwrap_or(record))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Effective role of a user. Absence of a record is not an error; an
    /// unknown user is a patient.
    pub async fn role_of(&self, user_id: &str) -> Role {
        match self.roles.get(&user_id.to_string()).await {
            Some(record) => record.role,
            None => Role::Patient,
        }
    }

    /// Current directory snapshot for a user, defaulting to a patient
    /// record when none is stored.
    pub async fn record_of(&self, user_id: &str) -> RoleRecord {
        self.roles
            .get(&user_id.to_string())
            .await
            .unwrap_or_else(|| RoleRecord::new_patient(user_id))
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<RoleRecord, RoleDirectoryError> {
        self.register(user_id).await?;
        let updated = self
            .roles
            .try_update(&user_id.to_string(), |record| {
                record.role = role;
                record.updated_at = Utc::now();
                Ok::<(), RoleDirectoryError>(())
            })
            .await?;
        info!("Role for {} set to {}", user_id, role);
        Ok(updated)
    }

    /// Raises the force-logout edge signal for a user. The signal stays up
    /// until the user's live session consumes it.
    pub async fn request_logout(&self, user_id: &str) -> Result<RoleRecord, RoleDirectoryError> {
        self.register(user_id).await?;
        let updated = self
            .roles
            .try_update(&user_id.to_string(), |record| {
                record.force_logout = true;
                record.updated_at = Utc::now();
                Ok::<(), RoleDirectoryError>(())
            })
            .await?;
        warn!("Forced logout requested for {}", user_id);
        Ok(updated)
    }

    pub async fn clear_force_logout(&self, user_id: &str) -> Result<RoleRecord, RoleDirectoryError> {
        let updated = self
            .roles
            .try_update(&user_id.to_string(), |record| {
                record.force_logout = false;
                record.updated_at = Utc::now();
                Ok::<(), RoleDirectoryError>(())
            })
            .await?;
        debug!("Force-logout flag for {} reset", user_id);
        Ok(updated)
    }

    /// Live view of one user's record: the current state first, then every
    /// committed change.
    pub fn watch(&self, user_id: &str) -> RoleWatch {
        RoleWatch {
            feed: self.roles.watch(),
            directory: self.clone(),
            user_id: user_id.to_string(),
            primed: false,
        }
    }
}

/// Subscription to one user's directory record. The feed is subscribed
/// before the initial snapshot is read, so no change can fall between the
/// two; duplicates are possible and harmless since every event carries full
/// state. A lagged subscription resynchronizes instead of erroring, which
/// makes the watch restartable after a slow consumer catches up.
pub struct RoleWatch {
    feed: Feed<RoleRecord>,
    directory: RoleDirectoryService,
    user_id: String,
    primed: bool,
}

impl RoleWatch {
    pub async fn next(&mut self) -> Option<RoleRecord> {
        if !self.primed {
            self.primed = true;
            return Some(self.directory.record_of(&self.user_id).await);
        }

        loop {
            match self.feed.next().await? {
                FeedEvent::Changed(record) if record.user_id == self.user_id => {
                    return Some(record)
                }
                FeedEvent::Changed(_) => continue,
                FeedEvent::Resync(_) => {
                    return Some(self.directory.record_of(&self.user_id).await)
                }
            }
        }
    }
}
