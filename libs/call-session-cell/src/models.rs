// libs/call-session-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::triage::Urgency;
use shared_store::{Document, StoreError};

// =====================================================================================
// CALL SESSIONS
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSessionStatus {
    Waiting,
    Active,
    Ended,
    Missed,
}

impl CallSessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallSessionStatus::Ended | CallSessionStatus::Missed)
    }
}

impl fmt::Display for CallSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSessionStatus::Waiting => write!(f, "waiting"),
            CallSessionStatus::Active => write!(f, "active"),
            CallSessionStatus::Ended => write!(f, "ended"),
            CallSessionStatus::Missed => write!(f, "missed"),
        }
    }
}

/// Who is calling, captured from the authenticated user at initiation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&User> for CallerIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.email.clone().unwrap_or_else(|| user.id.clone()),
            email: user.email.clone(),
            phone: None,
        }
    }
}

/// One consultation call, keyed by its channel name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub id: Uuid,
    /// `"{patient_id}_{unix_millis}"` - unique without a coordinator.
    pub channel_name: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub call_type: CallType,
    pub urgency: Urgency,
    pub status: CallSessionStatus,
    pub requested_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Document for CallSession {
    type Id = String;

    fn id(&self) -> String {
        self.channel_name.clone()
    }
}

// =====================================================================================
// REQUESTS & SWEEP REPORTING
// =====================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateCallRequest {
    pub call_type: CallType,
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
}

fn default_urgency() -> Urgency {
    Urgency::Medium
}

/// Counts from one clean expiry sweep. A sweep with failed updates reports
/// them through [`CallSessionError::SweepPartialFailure`] instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepOutcome {
    pub examined: usize,
    pub swept: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub channel_name: String,
    pub reason: String,
}

// =====================================================================================
// ERRORS
// =====================================================================================

#[derive(Error, Debug)]
pub enum CallSessionError {
    #[error("No authenticated caller identity")]
    NotAuthenticated,

    #[error("Call session not found: {0}")]
    NotFound(String),

    #[error("Sweep finished with {} failed updates", .failures.len())]
    SweepPartialFailure { failures: Vec<SweepFailure> },

    #[error("RTC credentials are not configured")]
    RtcNotConfigured,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CallSessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => CallSessionError::NotFound(id),
            other => CallSessionError::Store(other),
        }
    }
}

impl From<CallSessionError> for AppError {
    fn from(err: CallSessionError) -> Self {
        let message = err.to_string();
        match err {
            CallSessionError::NotAuthenticated => AppError::Auth(message),
            CallSessionError::NotFound(_) => AppError::NotFound(message),
            CallSessionError::SweepPartialFailure { .. }
            | CallSessionError::RtcNotConfigured
            | CallSessionError::TokenSigning(_) => AppError::Internal(message),
            CallSessionError::Store(_) => AppError::Database(message),
        }
    }
}
