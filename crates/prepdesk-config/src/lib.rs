//! Shared configuration for PrepDesk tools.
//!
//! TOML profiles, internal-key resolution (env + keyring + plaintext),
//! session-token persistence, and translation of a profile into the
//! location provider and check-in options `prepdesk-core` takes. The CLI
//! layers its flag overrides on top.

mod session_store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use prepdesk_api::{Coordinates, TransportConfig};
use prepdesk_core::{
    CheckInOptions, FixedLocation, HttpLocation, LocationSource, NoLocation, PositionOptions,
};

pub use session_store::FileTokenStore;

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "prepdesk";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named institute profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, listing the known names on failure.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named institute profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// API root, e.g. "https://desk.example.com/api".
    pub api_url: String,

    /// Internal-access key (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_key: Option<String>,

    /// Environment variable name containing the internal-access key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_key_env: Option<String>,

    /// Fixed kiosk position. Both or neither.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Geo-IP endpoint used when no fixed position is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_age_secs: Option<u64>,

    /// Minimum gap between two location-error notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toast_cooldown_secs: Option<u64>,

    /// Override the HTTP request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    /// Parse `api_url`.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_url("api_url", &self.api_url)
    }

    /// The fixed position, if both coordinates are set.
    pub fn fixed_coordinates(&self) -> Result<Option<Coordinates>, ConfigError> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Some(Coordinates::new(latitude, longitude))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Validation {
                field: "latitude/longitude".into(),
                reason: "set both or neither".into(),
            }),
        }
    }

    /// Position request parameters, defaulting to 10 s timeout and 60 s
    /// maximum age.
    pub fn position_options(&self) -> PositionOptions {
        let defaults = PositionOptions::default();
        PositionOptions {
            high_accuracy: true,
            timeout: self
                .geolocation_timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            maximum_age: self
                .maximum_age_secs
                .map_or(defaults.maximum_age, Duration::from_secs),
        }
    }

    pub fn checkin_options(&self) -> CheckInOptions {
        let defaults = CheckInOptions::default();
        CheckInOptions {
            position: self.position_options(),
            toast_cooldown: self
                .toast_cooldown_secs
                .map_or(defaults.toast_cooldown, Duration::from_secs),
        }
    }

    /// Pick the location provider: fixed coordinates win over a geo-IP
    /// endpoint; with neither the capability is reported as unsupported.
    /// The geo-IP provider gets its own client built from `transport`
    /// minus the internal-access key.
    pub fn location_source(
        &self,
        transport: &TransportConfig,
    ) -> Result<LocationSource, ConfigError> {
        if let Some(coords) = self.fixed_coordinates()? {
            let fixed = FixedLocation::new(coords).map_err(|e| ConfigError::Validation {
                field: "latitude/longitude".into(),
                reason: e.to_string(),
            })?;
            return Ok(LocationSource::Fixed(fixed));
        }
        if let Some(ref raw) = self.geolocation_url {
            let url = parse_url("geolocation_url", raw)?;
            let provider =
                HttpLocation::from_transport(transport, url).map_err(|e| ConfigError::Validation {
                    field: "geolocation_url".into(),
                    reason: e.to_string(),
                })?;
            return Ok(LocationSource::Http(provider));
        }
        Ok(LocationSource::Unsupported(NoLocation))
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("app", "prepdesk", "prepdesk")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("prepdesk");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the session tokens for `profile_name` are kept.
pub fn session_path(profile_name: &str) -> PathBuf {
    let dir = project_dirs().map_or_else(
        || dirs_fallback().join("sessions"),
        |dirs| dirs.data_dir().join("sessions"),
    );
    dir.join(format!("{profile_name}.json"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
///
/// A missing file yields the defaults; a file that exists but does not
/// parse is an error.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment.
///
/// Environment overrides use `PREPDESK_` and `__` as the nesting
/// separator, e.g. `PREPDESK_PROFILES__DEFAULT__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PREPDESK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/internal-key"),
    )?)
}

/// Resolve the internal-access key. It is optional: deployments without
/// the header check simply have none configured.
pub fn resolve_internal_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's internal_key_env → env var lookup
    if let Some(ref env_name) = profile.internal_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.internal_key.clone().map(SecretString::from)
}

/// Store the internal-access key in the system keyring.
pub fn store_internal_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile() -> Profile {
        Profile {
            api_url: "https://desk.example.com/api".into(),
            ..Profile::default()
        }
    }

    #[test]
    fn load_reads_profiles_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "front-desk"

[defaults]
output = "json"

[profiles.front-desk]
api_url = "https://desk.example.com/api"
latitude = 27.7172
longitude = 85.324
toast_cooldown_secs = 5
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("front-desk"));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 30);

        let profile = cfg.profile("front-desk").unwrap();
        assert_eq!(
            profile.fixed_coordinates().unwrap(),
            Some(Coordinates::new(27.7172, 85.324))
        );
        assert_eq!(
            profile.checkin_options().toast_cooldown,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                geolocation_url: Some("https://geo.example.com/json".into()),
                ..profile()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("internal_key"));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profile("default").unwrap(), cfg.profile("default").unwrap());
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("b".into(), profile());
        cfg.profiles.insert("a".into(), profile());
        match cfg.profile("c") {
            Err(ConfigError::ProfileNotFound { available, .. }) => {
                assert_eq!(available, vec!["a".to_owned(), "b".to_owned()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn half_a_position_is_rejected() {
        let p = Profile {
            latitude: Some(27.0),
            ..profile()
        };
        assert!(matches!(
            p.fixed_coordinates(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn location_source_precedence() {
        let transport = TransportConfig::default();
        let both = Profile {
            latitude: Some(27.0),
            longitude: Some(85.0),
            geolocation_url: Some("https://geo.example.com/json".into()),
            ..profile()
        };
        assert!(matches!(
            both.location_source(&transport).unwrap(),
            LocationSource::Fixed(_)
        ));

        let geo = Profile {
            geolocation_url: Some("https://geo.example.com/json".into()),
            ..profile()
        };
        assert!(matches!(
            geo.location_source(&transport).unwrap(),
            LocationSource::Http(_)
        ));

        assert!(matches!(
            profile().location_source(&transport).unwrap(),
            LocationSource::Unsupported(_)
        ));

        let out_of_range = Profile {
            latitude: Some(120.0),
            longitude: Some(0.0),
            ..profile()
        };
        assert!(out_of_range.location_source(&transport).is_err());
    }

    #[test]
    fn position_options_default_and_override() {
        assert_eq!(profile().position_options(), PositionOptions::default());
        let p = Profile {
            geolocation_timeout_secs: Some(3),
            maximum_age_secs: Some(0),
            ..profile()
        };
        let options = p.position_options();
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.maximum_age, Duration::ZERO);
    }

    #[test]
    fn session_path_is_per_profile() {
        let a = session_path("front-desk");
        assert!(a.ends_with("sessions/front-desk.json"));
        assert_ne!(a, session_path("lab"));
    }
}
