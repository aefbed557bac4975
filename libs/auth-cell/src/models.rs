// libs/auth-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_store::{Document, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct SetTokenRequest {
    pub token: String,
}

/// One open cookie session, keyed by the token the cookie carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Document for SessionRecord {
    type Id = String;

    fn id(&self) -> String {
        self.token.clone()
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidToken(_) | AuthError::NotAuthenticated => AppError::Auth(message),
            AuthError::Store(_) => AppError::Database(message),
        }
    }
}
