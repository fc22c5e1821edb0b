//! CLI configuration: thin wrapper around `prepdesk_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --internal-key, --timeout).

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use prepdesk_api::{ApiClient, Session, TransportConfig};
use prepdesk_config::FileTokenStore;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use prepdesk_config::{Config, Profile, config_path, load_config, save_config};

/// Everything a command needs to talk to one institute API.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub api_url: Url,
    pub transport: TransportConfig,
}

impl Resolved {
    /// An API client without a session (public endpoints only).
    pub fn client(&self) -> Result<ApiClient, CliError> {
        Ok(ApiClient::new(self.api_url.clone(), &self.transport)?)
    }

    /// An API client bound to this profile's persisted session.
    pub fn session_client(&self) -> Result<(ApiClient, Session), CliError> {
        let session = Session::new(Arc::new(FileTokenStore::for_profile(&self.profile_name)));
        session.init()?;
        let client = self.client()?.with_session(session.clone());
        Ok((client, session))
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Combine the config file, the active profile and the global flags.
///
/// Flags win over the profile. Without a profile, `--api-url` alone is
/// enough; an explicitly requested profile must exist.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profile(&profile_name) {
        Ok(profile) => profile.clone(),
        Err(e) if global.profile.is_some() => return Err(e.into()),
        Err(_) => Profile::default(),
    };

    // 1. API URL (flag > env > profile)
    let url_str = global
        .api_url
        .as_deref()
        .unwrap_or(profile.api_url.as_str());
    if url_str.trim().is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    let api_url: Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    // 2. Timeout (flag > profile > defaults)
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);

    // 3. Internal-access key (flag > profile credential chain)
    let mut transport = TransportConfig::default().with_timeout(Duration::from_secs(timeout));
    let key = global
        .internal_key
        .clone()
        .map(SecretString::from)
        .or_else(|| prepdesk_config::resolve_internal_key(&profile, &profile_name));
    if let Some(key) = key {
        transport = transport.with_internal_key(key);
    }

    tracing::debug!(profile = %profile_name, %api_url, timeout, "resolved configuration");
    Ok(Resolved {
        profile_name,
        profile,
        api_url,
        transport,
    })
}
