//! Cooldown rate limiter for user-facing notifications.
//!
//! Browsers (and flaky geo-IP lookups) can report the same failure several
//! times in quick succession; only the first report inside a window reaches
//! the user.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Default window between two error notifications of the same kind.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    last: Option<DateTime<Utc>>,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Accept if nothing was accepted within the window before `now`.
    ///
    /// A clock that moved backwards counts as "within the window".
    pub fn try_acquire<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        let now = now.with_timezone(&Utc);
        if let Some(last) = self.last {
            match (now - last).to_std() {
                Ok(elapsed) if elapsed >= self.window => {}
                _ => return false,
            }
        }
        self.last = Some(now);
        true
    }
}
