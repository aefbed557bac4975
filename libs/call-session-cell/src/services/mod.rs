pub mod session;
pub mod sweeper;
pub mod token;
