//! Auth cell: cookie sessions and role-gated page access.
//!
//! A client exchanges its bearer token for an HTTP-only session cookie
//! (`POST /api/setToken`), and from then on the reception and admin page
//! trees are gated on that cookie plus the live role directory. Anyone who
//! fails the gate is routed to the login page. Each open session runs a
//! monitor on its user's directory record, so a forced logout revokes the
//! session without waiting for the next request.

pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::cookie::{build_session_cookie, clear_session_cookie, session_token_from_headers};
pub use services::gate::{admin_gate, reception_gate};
pub use services::session::SessionService;
pub use router::{auth_routes, AuthCellState};
