//! Check-in logic between `prepdesk-api` and the front ends.
//!
//! - **[`CheckIn`]**: the attendance check-in state machine for one
//!   scanned QR code: token verdict, one-shot location attempt, phone
//!   input, a single submission, and the "Try Again" reset. Progress is
//!   published as [`Phase`] values on a `watch` channel.
//!
//! - **[`token`]**: advisory decoding of the dynamic QR token (date and
//!   expiry only; the server re-verifies on submit).
//!
//! - **[`geolocation`]**: [`LocationProvider`] implementations and the
//!   timeout-bounded [`acquire`](geolocation::acquire).
//!
//! - **[`notify`]**, **[`cooldown`]**, **[`guard`]**, **[`clock`]**: the
//!   injectable side-effect seams and the small state machines the flow is
//!   built from.

pub mod checkin;
pub mod clock;
pub mod cooldown;
pub mod entry;
pub mod error;
pub mod geolocation;
pub mod guard;
pub mod notify;
pub mod outcome;
pub mod token;

// ── Primary re-exports ──────────────────────────────────────────────
pub use checkin::{CheckIn, CheckInOptions, Phase, Services};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::Cooldown;
pub use entry::{parse_entry, token_from_entry_url};
pub use error::CoreError;
pub use geolocation::{
    CachedLocation, FixedLocation, GeolocationError, HttpLocation, LocationProvider,
    LocationSource, NoLocation, PositionOptions,
};
pub use guard::OneShot;
pub use notify::{Level, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use outcome::{CheckInOutcome, DisplayStamp};
pub use token::{ExpiryReason, QrClaims, TokenStatus, validate_token};
