// prepdesk-api: Async Rust client for the PrepDesk institute REST API

pub mod attendance;
pub mod auth;
pub mod client;
pub mod error;
pub mod session;
pub mod transport;

pub use attendance::{Coordinates, MarkAttendanceRequest, MarkAttendanceResponse};
pub use client::{Access, ApiClient};
pub use error::Error;
pub use session::{MemoryTokenStore, Session, SessionTokens, SessionUser, TokenStore};
pub use transport::{INTERNAL_KEY_HEADER, TransportConfig};
