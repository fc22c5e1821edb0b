// Shared transport configuration for building reqwest::Client instances.
//
// The API client and the HTTP location provider share timeout and user
// agent settings through this module. Only API clients carry the
// internal-access header.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header carrying the deployment's internal-access key.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-access-key";

const DEFAULT_USER_AGENT: &str = concat!("prepdesk/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent as [`INTERNAL_KEY_HEADER`] on every request when present.
    pub internal_key: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.into(),
            internal_key: None,
        }
    }
}

impl TransportConfig {
    /// Attach the internal-access key header to every request.
    pub fn with_internal_key(mut self, key: SecretString) -> Self {
        self.internal_key = Some(key);
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The same settings without the internal-access key, for clients
    /// that talk to hosts outside the deployment.
    pub fn without_internal_key(&self) -> Self {
        Self {
            internal_key: None,
            ..self.clone()
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(self.default_headers()?)
            .build()
            .map_err(Error::Transport)
    }

    fn default_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.internal_key {
            let mut value = HeaderValue::from_str(key.expose_secret()).map_err(|_| {
                Error::InvalidHeader {
                    name: INTERNAL_KEY_HEADER,
                }
            })?;
            value.set_sensitive(true);
            headers.insert(INTERNAL_KEY_HEADER, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_key_becomes_sensitive_default_header() {
        let config =
            TransportConfig::default().with_internal_key(SecretString::from("k-123".to_owned()));
        let headers = config.default_headers().expect("valid header");
        let value = headers.get(INTERNAL_KEY_HEADER).expect("header present");
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().ok(), Some("k-123"));
    }

    #[test]
    fn control_characters_in_key_are_rejected() {
        let config = TransportConfig::default()
            .with_internal_key(SecretString::from("bad\nkey".to_owned()));
        assert!(matches!(
            config.build_client(),
            Err(Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn stripped_config_keeps_settings_but_not_key() {
        let config = TransportConfig::default()
            .with_timeout(Duration::from_secs(7))
            .with_internal_key(SecretString::from("k-123".to_owned()));
        let stripped = config.without_internal_key();

        assert!(stripped.internal_key.is_none());
        assert_eq!(stripped.timeout, Duration::from_secs(7));
        assert_eq!(stripped.user_agent, config.user_agent);
        assert!(stripped.default_headers().expect("empty headers").is_empty());
        assert!(config.internal_key.is_some());
    }

    #[test]
    fn no_key_means_no_headers() {
        let headers = TransportConfig::default()
            .default_headers()
            .expect("empty headers");
        assert!(headers.is_empty());
    }
}
