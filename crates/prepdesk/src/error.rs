//! CLI error types with miette diagnostics.
//!
//! Maps API, core and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use prepdesk_config::ConfigError;
use prepdesk_core::CoreError;

/// Process exit codes.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const QR_REJECTED: i32 = 9;
    pub const LOCATION: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the API at {url}")]
    #[diagnostic(
        code(prepdesk::connection_failed),
        help(
            "Check the API URL and your network connection.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(prepdesk::timeout),
        help("Increase the timeout with --timeout or check API responsiveness.")
    )]
    Timeout { url: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Sign-in failed: {message}")]
    #[diagnostic(code(prepdesk::auth_failed), help("Check your email and password."))]
    AuthFailed { message: String },

    #[error("Not signed in")]
    #[diagnostic(code(prepdesk::not_logged_in), help("Run: prepdesk login"))]
    NotLoggedIn,

    #[error("Session expired")]
    #[diagnostic(code(prepdesk::session_expired), help("Run: prepdesk login"))]
    SessionExpired,

    #[error("Could not access the saved session: {message}")]
    #[diagnostic(code(prepdesk::session_store))]
    SessionStore { message: String },

    // ── Check-in ─────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(prepdesk::qr_rejected),
        help("Scan the QR code currently shown at the front desk.")
    )]
    QrRejected { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(prepdesk::location),
        help(
            "Pass --latitude/--longitude, set a fixed position in your profile,\n\
             or configure geolocation_url."
        )
    )]
    LocationUnavailable { message: String },

    #[error("{message}")]
    #[diagnostic(code(prepdesk::attendance_failed))]
    AttendanceFailed { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(prepdesk::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected response from the API: {message}")]
    #[diagnostic(code(prepdesk::unexpected_response))]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(prepdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(prepdesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: prepdesk config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API URL configured")]
    #[diagnostic(
        code(prepdesk::no_config),
        help(
            "Create a profile with: prepdesk config init\n\
             Or pass --api-url / set PREPDESK_API_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(prepdesk::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {message}")]
    #[diagnostic(code(prepdesk::keyring))]
    Keyring { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(prepdesk::render))]
    Render { message: String },
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotLoggedIn | Self::SessionExpired => exit_code::AUTH,
            Self::ApiError { status: 404, .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::QrRejected { .. } => exit_code::QR_REJECTED,
            Self::LocationUnavailable { .. } => exit_code::LOCATION,
            _ => exit_code::GENERAL,
        }
    }

    /// Map a dialoguer / interactive I/O failure.
    pub fn prompt(e: impl std::fmt::Display) -> Self {
        Self::Validation {
            field: "interactive".into(),
            reason: format!("prompt failed: {e}"),
        }
    }
}

// ── prepdesk_api::Error → CliError ───────────────────────────────────

impl From<prepdesk_api::Error> for CliError {
    fn from(err: prepdesk_api::Error) -> Self {
        use prepdesk_api::Error as E;

        match err {
            E::Authentication { message } => Self::AuthFailed { message },
            E::SessionExpired => Self::SessionExpired,
            E::NotAuthenticated => Self::NotLoggedIn,
            E::Transport(e) => {
                let url = e
                    .url()
                    .map_or_else(|| "(unknown)".to_owned(), ToString::to_string);
                if e.is_timeout() {
                    Self::Timeout { url }
                } else if let Some(status) = e.status() {
                    Self::ApiError {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    Self::ConnectionFailed {
                        url,
                        source: Box::new(e),
                    }
                }
            }
            E::InvalidUrl(e) => Self::Validation {
                field: "api_url".into(),
                reason: e.to_string(),
            },
            E::InvalidHeader { name } => Self::Validation {
                field: name.into(),
                reason: "not a valid HTTP header value".into(),
            },
            E::Api { status, message } => Self::ApiError {
                status,
                message: message.unwrap_or_else(|| "no message".into()),
            },
            E::Deserialization { message, .. } => Self::UnexpectedResponse { message },
            E::TokenStore(message) => Self::SessionStore { message },
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidEntryUrl { url, reason } => Self::Validation {
                field: "url".into(),
                reason: format!("{url}: {reason}"),
            },
            e @ CoreError::InvalidCoordinates { .. } => Self::Validation {
                field: "latitude/longitude".into(),
                reason: e.to_string(),
            },
            CoreError::Api(e) => e.into(),
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => Self::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Serialization(e) => Self::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}
