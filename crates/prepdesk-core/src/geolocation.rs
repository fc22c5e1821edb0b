//! Device position acquisition.
//!
//! A [`LocationProvider`] stands in for the device sensor. The check-in
//! flow calls [`acquire`] once per attempt; nothing here retries on its
//! own. Every failure maps to one of four [`GeolocationError`] codes with a
//! fixed user-facing message.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use prepdesk_api::{Coordinates, TransportConfig};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::error::CoreError;

pub const SUCCESS_MESSAGE: &str = "Location acquired successfully";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Geolocation is not supported by this browser.")]
    Unsupported,

    #[error("Location access denied. Please allow location access and try again.")]
    PermissionDenied,

    #[error("Location information is unavailable. Please try again.")]
    PositionUnavailable,

    #[error("Location request timed out. Please try again.")]
    Timeout,
}

impl GeolocationError {
    /// The fixed message shown to the user.
    pub fn message(self) -> String {
        self.to_string()
    }

    /// Whether a manual retry could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Parameters for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Upper bound on one acquisition attempt.
    pub timeout: Duration,
    /// How old a cached position may be and still be reused.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

/// A source of device coordinates.
pub trait LocationProvider: Send + Sync {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Coordinates, GeolocationError>> + Send;
}

/// Run one acquisition attempt, bounded by `options.timeout`.
pub async fn acquire<L>(
    provider: &L,
    options: &PositionOptions,
) -> Result<Coordinates, GeolocationError>
where
    L: LocationProvider + ?Sized,
{
    match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(Ok(coords)) => {
            debug!(
                latitude = coords.latitude,
                longitude = coords.longitude,
                "position acquired"
            );
            Ok(coords)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "position request failed");
            Err(e)
        }
        Err(_) => {
            warn!(timeout = ?options.timeout, "position request timed out");
            Err(GeolocationError::Timeout)
        }
    }
}

// ── Providers ────────────────────────────────────────────────────────

/// Always reports the same coordinates (a kiosk with a known location).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coords: Coordinates,
}

impl FixedLocation {
    pub fn new(coords: Coordinates) -> Result<Self, CoreError> {
        if !coords.is_valid() {
            return Err(CoreError::InvalidCoordinates {
                latitude: coords.latitude,
                longitude: coords.longitude,
            });
        }
        Ok(Self { coords })
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coords
    }
}

impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Ok(self.coords)
    }
}

/// The capability is absent altogether.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Accepts `{"latitude": .., "longitude": ..}` as well as the short
/// `lat`/`lon` spellings most geo-IP services use.
#[derive(Deserialize)]
struct PositionBody {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

/// Looks the position up from a geo-IP style HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpLocation {
    http: reqwest::Client,
    url: Url,
}

impl HttpLocation {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Build the provider on its own client. The lookup host is outside the
    /// deployment, so the internal-access key is never attached.
    pub fn from_transport(transport: &TransportConfig, url: Url) -> Result<Self, CoreError> {
        let http = transport.without_internal_key().build_client()?;
        Ok(Self::new(http, url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl LocationProvider for HttpLocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        debug!(url = %self.url, high_accuracy = options.high_accuracy, "requesting position");
        let resp = self
            .http
            .get(self.url.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeolocationError::Timeout
                } else {
                    debug!(error = %e, "position lookup failed");
                    GeolocationError::PositionUnavailable
                }
            })?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeolocationError::PermissionDenied);
            }
            status if !status.is_success() => {
                debug!(%status, "position lookup rejected");
                return Err(GeolocationError::PositionUnavailable);
            }
            _ => {}
        }

        let body: PositionBody = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                debug!(error = %e, "position body unreadable");
                GeolocationError::PositionUnavailable
            }
        })?;

        let coords = Coordinates::new(body.latitude, body.longitude);
        if coords.is_valid() {
            Ok(coords)
        } else {
            Err(GeolocationError::PositionUnavailable)
        }
    }
}

/// Whichever provider the configuration selected.
#[derive(Debug, Clone)]
pub enum LocationSource {
    Fixed(FixedLocation),
    Http(HttpLocation),
    Unsupported(NoLocation),
}

impl LocationProvider for LocationSource {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        match self {
            Self::Fixed(p) => p.current_position(options).await,
            Self::Http(p) => p.current_position(options).await,
            Self::Unsupported(p) => p.current_position(options).await,
        }
    }
}

/// Reuses the last good position while it is younger than
/// `options.maximum_age`.
#[derive(Debug)]
pub struct CachedLocation<P> {
    inner: P,
    last: Mutex<Option<(Coordinates, Instant)>>,
}

impl<P> CachedLocation<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinates> {
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.filter(|(_, at)| at.elapsed() <= maximum_age)
            .map(|(coords, _)| coords)
    }
}

impl<P: LocationProvider> LocationProvider for CachedLocation<P> {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        if let Some(coords) = self.cached(options.maximum_age) {
            debug!("using cached position");
            return Ok(coords);
        }
        let coords = self.inner.current_position(options).await?;
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some((coords, Instant::now()));
        Ok(coords)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Counts calls and answers after an optional delay.
    struct StubSensor {
        calls: AtomicUsize,
        delay: Duration,
        answer: Result<Coordinates, GeolocationError>,
    }

    impl StubSensor {
        fn new(answer: Result<Coordinates, GeolocationError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                answer,
            }
        }
    }

    impl LocationProvider for StubSensor {
        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<Coordinates, GeolocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer
        }
    }

    fn desk() -> Coordinates {
        Coordinates::new(27.7172, 85.3240)
    }

    #[test]
    fn default_options() {
        let options = PositionOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.maximum_age, Duration::from_secs(60));
    }

    #[test]
    fn fixed_location_rejects_out_of_range() {
        assert!(FixedLocation::new(Coordinates::new(91.0, 0.0)).is_err());
        assert!(FixedLocation::new(Coordinates::new(0.0, -180.5)).is_err());
        assert!(FixedLocation::new(desk()).is_ok());
    }

    #[test]
    fn unsupported_message_and_retryability() {
        assert_eq!(
            GeolocationError::Unsupported.message(),
            "Geolocation is not supported by this browser."
        );
        assert!(!GeolocationError::Unsupported.is_retryable());
        assert!(GeolocationError::Timeout.is_retryable());
    }

    #[test]
    fn http_location_ignores_the_internal_key() {
        let url = Url::parse("https://geo.example.com/json").unwrap();
        // A key that could not even be sent as a header is never touched.
        let transport = TransportConfig::default()
            .with_internal_key(secrecy::SecretString::from("bad\nkey".to_owned()));
        assert!(transport.build_client().is_err());

        let provider = HttpLocation::from_transport(&transport, url.clone()).unwrap();
        assert_eq!(provider.url(), &url);
    }

    #[tokio::test]
    async fn no_location_is_unsupported() {
        let err = acquire(&NoLocation, &PositionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, GeolocationError::Unsupported);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let mut sensor = StubSensor::new(Ok(desk()));
        sensor.delay = Duration::from_secs(30);
        let err = acquire(&sensor, &PositionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, GeolocationError::Timeout);
        assert_eq!(sensor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_honors_maximum_age() {
        let cached = CachedLocation::new(StubSensor::new(Ok(desk())));
        let options = PositionOptions::default();

        assert_eq!(acquire(&cached, &options).await.unwrap(), desk());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(acquire(&cached, &options).await.unwrap(), desk());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        acquire(&cached, &options).await.unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_does_not_store_failures() {
        let cached = CachedLocation::new(StubSensor::new(Err(GeolocationError::PositionUnavailable)));
        let options = PositionOptions::default();
        assert!(acquire(&cached, &options).await.is_err());
        assert!(acquire(&cached, &options).await.is_err());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }
}
