use thiserror::Error;

/// Top-level error type for the `prepdesk-api` crate.
///
/// Covers authentication, transport, and API-level failures. `prepdesk-core`
/// turns these into user-facing messages; nothing here is shown verbatim
/// to a student at the kiosk.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, disabled account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The access token was rejected and could not be refreshed.
    #[error("Session expired -- log in again")]
    SessionExpired,

    /// An authenticated call was attempted without a session.
    #[error("Not logged in")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configured header value cannot be sent over HTTP.
    #[error("Invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status. `message` is the server's `message` or
    /// `error` field when the body carried one.
    #[error("API error (HTTP {status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Persisted session tokens could not be read or written.
    #[error("Token store error: {0}")]
    TokenStore(String),
}

impl Error {
    /// HTTP status code associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The server-provided message, if the error response carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn api_error_display_includes_server_message() {
        let err = Error::Api {
            status: 400,
            message: Some("phone number is required".into()),
        };
        assert_eq!(
            err.to_string(),
            "API error (HTTP 400): phone number is required"
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), Some("phone number is required"));
    }

    #[test]
    fn api_error_display_without_message() {
        let err = Error::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "API error (HTTP 502): no message");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn session_errors_carry_no_status() {
        assert_eq!(Error::SessionExpired.status(), None);
        assert_eq!(Error::NotAuthenticated.server_message(), None);
    }
}
