// ── Attendance check-in ──
//
// One `CheckIn` per scanned QR code. It owns every piece of transient
// state (token verdict, location, phone number, result) and is the only
// writer; front ends observe it through `subscribe()`.
//
// validating-token → invalid | acquiring-location
// acquiring-location → location-error | awaiting-input
// awaiting-input → submitting → success | failure
//
// Runtime failures never escape as errors: each becomes a phase plus a
// notification.

use std::sync::Arc;
use std::time::Duration;

use prepdesk_api::{ApiClient, Coordinates, MarkAttendanceRequest};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::cooldown::{Cooldown, DEFAULT_COOLDOWN};
use crate::geolocation::{self, GeolocationError, LocationProvider, PositionOptions};
use crate::guard::OneShot;
use crate::notify::{Level, Notification, Notifier, TracingNotifier};
use crate::outcome::{self, CheckInOutcome};
use crate::token::{self, TokenStatus};

/// Where a check-in currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "phase", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    ValidatingToken,
    /// Terminal: the QR code cannot be used.
    Invalid { message: String },
    AcquiringLocation,
    /// Recoverable through [`CheckIn::retry_location`].
    LocationError { message: String },
    /// Location held; waiting for the phone number and a submit.
    AwaitingInput,
    Submitting,
    Success(CheckInOutcome),
    /// Recoverable through [`CheckIn::try_again`].
    Failure { message: String },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::Success(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInOptions {
    pub position: PositionOptions,
    /// Minimum gap between two location-error notifications.
    pub toast_cooldown: Duration,
}

impl Default for CheckInOptions {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            toast_cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Side-effect seams: where notifications go and what time it is.
#[derive(Clone)]
pub struct Services {
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// A single attendance check-in.
pub struct CheckIn<L> {
    client: ApiClient,
    provider: L,
    options: CheckInOptions,
    services: Services,

    token: Option<String>,
    status: TokenStatus,
    phone_number: String,
    location: Option<Coordinates>,
    location_error: Option<GeolocationError>,
    locating: bool,
    guard: OneShot,
    error_toasts: Cooldown,

    phase: watch::Sender<Phase>,
}

impl<L: LocationProvider> CheckIn<L> {
    /// Validate `token` (absent for the static QR code) and set up the flow.
    ///
    /// Validation happens here and only here; an unusable token is terminal.
    pub fn new(
        client: ApiClient,
        provider: L,
        token: Option<String>,
        options: CheckInOptions,
        services: Services,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::ValidatingToken);
        let token = token.filter(|t| !t.trim().is_empty());
        let status = token::validate_token(token.as_deref(), &services.clock.now());

        let this = Self {
            client,
            provider,
            options,
            error_toasts: Cooldown::new(options.toast_cooldown),
            services,
            token,
            status,
            phone_number: String::new(),
            location: None,
            location_error: None,
            locating: false,
            guard: OneShot::default(),
            phase,
        };

        match this.status.message() {
            Some(message) => {
                warn!(status = this.status.label(), "QR token rejected");
                this.toast(Level::Error, message);
                this.publish(Phase::Invalid {
                    message: message.to_owned(),
                });
            }
            None => {
                info!(status = this.status.label(), "QR token accepted");
                this.publish(Phase::AcquiringLocation);
            }
        }
        this
    }

    // ── Location ─────────────────────────────────────────────────────

    /// Whether the automatic location attempt should fire now.
    pub fn should_auto_locate(&self) -> bool {
        self.status.is_usable()
            && self.location.is_none()
            && !self.locating
            && self.location_error.is_none()
            && self.guard.can_begin()
    }

    /// Run the automatic location attempt if it is still due. Returns
    /// whether an attempt was made.
    pub async fn auto_locate(&mut self) -> bool {
        if !self.should_auto_locate() || !self.guard.begin() {
            return false;
        }
        self.locate().await;
        true
    }

    /// Manual retry after a location error: clears the error and re-arms
    /// the one-shot guard for exactly one more attempt.
    pub async fn retry_location(&mut self) -> bool {
        if !self.status.is_usable() || self.locating || self.location.is_some() {
            return false;
        }
        if matches!(self.phase(), Phase::Submitting | Phase::Success(_)) {
            return false;
        }
        self.location_error = None;
        self.guard.reset();
        self.auto_locate().await
    }

    /// Whether offering a manual retry makes sense: there is a location
    /// error and it is one a second attempt could clear.
    pub fn can_retry_location(&self) -> bool {
        self.location_error.is_some_and(GeolocationError::is_retryable)
    }

    async fn locate(&mut self) {
        self.locating = true;
        self.publish(Phase::AcquiringLocation);

        let result = geolocation::acquire(&self.provider, &self.options.position).await;
        self.locating = false;

        match result {
            Ok(coords) => {
                self.location = Some(coords);
                self.location_error = None;
                self.toast(Level::Success, geolocation::SUCCESS_MESSAGE);
                self.publish(Phase::AwaitingInput);
            }
            Err(e) => {
                self.location_error = Some(e);
                if self.error_toasts.try_acquire(&self.services.clock.now()) {
                    self.toast(Level::Error, &e.message());
                } else {
                    debug!(error = %e, "location error notification suppressed");
                }
                self.publish(Phase::LocationError {
                    message: e.message(),
                });
            }
        }
    }

    // ── Input ────────────────────────────────────────────────────────

    pub fn set_phone_number(&mut self, phone_number: impl Into<String>) {
        self.phone_number = phone_number.into();
    }

    /// True iff a phone number is entered, a location is held, and the
    /// check-in is neither submitting nor finished.
    pub fn can_submit(&self) -> bool {
        !self.phone_number.trim().is_empty() && self.location.is_some() && self.accepts_submit()
    }

    fn accepts_submit(&self) -> bool {
        !matches!(
            *self.phase.borrow(),
            Phase::Submitting | Phase::Success(_) | Phase::Failure { .. }
        )
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Send the attendance request. Exactly one network attempt per call;
    /// nothing is sent when a precondition is missing.
    pub async fn submit(&mut self) -> Phase {
        if !self.status.is_usable() || !self.accepts_submit() {
            return self.phase();
        }
        let phone_number = self.phone_number.trim().to_owned();
        if phone_number.is_empty() {
            self.toast(Level::Error, outcome::PHONE_REQUIRED);
            return self.phase();
        }
        let Some(location) = self.location else {
            self.toast(Level::Error, outcome::LOCATION_REQUIRED);
            return self.phase();
        };

        let request = MarkAttendanceRequest {
            token: self.token.clone().filter(|_| self.status.is_dynamic()),
            phone_number,
            location,
        };

        self.publish(Phase::Submitting);
        let acted_at = self.services.clock.now();
        debug!(dynamic = request.token.is_some(), "submitting attendance");

        let next = match self.client.mark_attendance(&request).await {
            Ok(response) => match outcome::interpret_response(response, &acted_at) {
                Ok(outcome) => {
                    let level = if outcome.already_marked {
                        Level::Info
                    } else {
                        Level::Success
                    };
                    info!(already_marked = outcome.already_marked, "attendance recorded");
                    self.toast(level, &outcome.message);
                    Phase::Success(outcome)
                }
                Err(message) => {
                    warn!(%message, "attendance rejected");
                    self.toast(Level::Error, &message);
                    Phase::Failure { message }
                }
            },
            Err(e) => {
                warn!(error = %e, "attendance request failed");
                let message = outcome::failure_message(&e);
                self.toast(Level::Error, &message);
                Phase::Failure { message }
            }
        };

        self.publish(next.clone());
        next
    }

    /// Start over after a failed submission: forget the phone number,
    /// location and errors, re-arm the guard and immediately re-run the
    /// location attempt. Returns `false` outside the failure phase.
    pub async fn try_again(&mut self) -> bool {
        if !matches!(self.phase(), Phase::Failure { .. }) {
            return false;
        }
        info!("restarting check-in");
        self.phone_number.clear();
        self.location = None;
        self.location_error = None;
        self.guard.reset();
        self.publish(Phase::AcquiringLocation);
        self.auto_locate().await
    }
}

impl<L> CheckIn<L> {
    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn token_status(&self) -> &TokenStatus {
        &self.status
    }

    pub fn is_static(&self) -> bool {
        matches!(self.status, TokenStatus::Static)
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    pub fn location_error(&self) -> Option<GeolocationError> {
        self.location_error
    }

    pub fn guard(&self) -> OneShot {
        self.guard
    }

    fn publish(&self, phase: Phase) {
        debug!(phase = phase.name(), "check-in phase");
        self.phase.send_replace(phase);
    }

    fn toast(&self, level: Level, message: &str) {
        self.services
            .notifier
            .notify(Notification::new(level, message));
    }
}
