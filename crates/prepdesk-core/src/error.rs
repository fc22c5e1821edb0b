// ── Core error types ──
//
// Errors surfaced by core setup paths (entry URLs, provider construction).
// The check-in flow itself never returns these: every runtime failure
// there becomes phase state plus a notification.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not an attendance link: {url} ({reason})")]
    InvalidEntryUrl { url: String, reason: String },

    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Api(#[from] prepdesk_api::Error),
}
