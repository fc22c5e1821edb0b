//! One-shot guard for the automatic location attempt.
//!
//! The attempt runs at most once per check-in session; only an explicit
//! reset (the "Try Again" affordance) re-arms it, and only for one more
//! attempt.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OneShot {
    #[default]
    NotAttempted,
    Attempted,
    ResetRequested,
}

impl OneShot {
    /// Whether an attempt may start now.
    pub fn can_begin(self) -> bool {
        matches!(self, Self::NotAttempted | Self::ResetRequested)
    }

    /// Claim the attempt. Returns `false` if it was already used.
    pub fn begin(&mut self) -> bool {
        if !self.can_begin() {
            return false;
        }
        *self = Self::Attempted;
        true
    }

    /// Re-arm for exactly one more attempt.
    pub fn reset(&mut self) {
        *self = Self::ResetRequested;
    }
}
