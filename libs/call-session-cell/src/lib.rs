//! Call session cell: real-time consultation signaling.
//!
//! A patient initiates a call and lands in the waiting queue under a channel
//! name derived from their identity and the initiation instant, unique
//! without any coordinator. Reception answers (`Waiting -> Active`), either
//! side hangs up (`-> Ended`), and a background sweeper expires calls nobody
//! answered (`Waiting -> Missed`). Media credentials are issued behind a
//! capability interface so the concrete RTC vendor stays swappable.

pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::session::CallSessionService;
pub use services::sweeper::CallSweeper;
pub use services::token::{HmacTokenSigner, RtcRole, RtcToken, RtcTokenProvider};
pub use router::{call_routes, token_routes, CallCellState};
