use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use shared_models::error::AppError;
use shared_store::{Document, StoreError};

// =====================================================================================
// ROLE DIRECTORY MODELS
// =====================================================================================

/// Access level of a user. Every identity without a directory record is a
/// plain patient; elevated roles exist only as explicit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Receptionist,
    Admin,
}

impl Role {
    pub fn can_manage_roles(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_work_reception(&self) -> bool {
        matches!(self, Role::Receptionist | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Receptionist => write!(f, "receptionist"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Directory record for one user. `force_logout` is an edge signal: an admin
/// raises it, the user's live session consumes it exactly once and resets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub user_id: String,
    pub role: Role,
    pub force_logout: bool,
    pub updated_at: DateTime<Utc>,
}

impl RoleRecord {
    pub fn new_patient(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: Role::Patient,
            force_logout: false,
            updated_at: Utc::now(),
        }
    }
}

impl Document for RoleRecord {
    type Id = String;

    fn id(&self) -> String {
        self.user_id.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

// =====================================================================================
// ERRORS
// =====================================================================================

#[derive(Error, Debug)]
pub enum RoleDirectoryError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<RoleDirectoryError> for AppError {
    fn from(err: RoleDirectoryError) -> Self {
        match err {
            RoleDirectoryError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
