pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::directory::{RoleDirectoryService, RoleWatch};
pub use services::watcher::{ForceLogoutMonitor, SessionHooks};
pub use router::{role_routes, RoleCellState};
