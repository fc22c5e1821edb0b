//! Command handlers: bridge CLI args -> core check-in / API calls -> output formatting.

pub mod checkin;
pub mod config_cmd;
pub mod session;
pub mod token;
pub mod util;
