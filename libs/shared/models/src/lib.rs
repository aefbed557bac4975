pub mod auth;
pub mod error;
pub mod triage;

pub use auth::{JwtClaims, User};
pub use error::AppError;
pub use triage::Urgency;
