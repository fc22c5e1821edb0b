// File-backed session persistence.
//
// One JSON file per profile under the platform data directory. On unix
// the file is created owner-read/write only.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use prepdesk_api::{Error, SessionTokens, SessionUser, TokenStore};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
}

/// Persists [`SessionTokens`] as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store for a named profile at its canonical location.
    pub fn for_profile(profile_name: &str) -> Self {
        Self::new(crate::session_path(profile_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn store_err(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::TokenStore(format!("failed to {action} {}: {e}", path.display()))
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SessionTokens>, Error> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_err("read", &self.path, e)),
        };

        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) => Ok(Some(SessionTokens {
                access_token: SecretString::from(stored.access_token),
                refresh_token: stored.refresh_token.map(SecretString::from),
                user: stored.user,
            })),
            Err(e) => {
                // A corrupt session file means "logged out", not a hard failure.
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, tokens: &SessionTokens) -> Result<(), Error> {
        let stored = StoredSession {
            access_token: tokens.access_token.expose_secret().to_owned(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            user: tokens.user.clone(),
        };
        let json =
            serde_json::to_vec_pretty(&stored).map_err(|e| store_err("encode", &self.path, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| store_err("create", parent, e))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| store_err("open", &self.path, e))?;
        file.write_all(&json)
            .map_err(|e| store_err("write", &self.path, e))?;

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_err("remove", &self.path, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use prepdesk_api::Session;

    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens {
            access_token: SecretString::from("access-1".to_owned()),
            refresh_token: Some(SecretString::from("refresh-1".to_owned())),
            user: Some(SessionUser {
                email: Some("desk@example.com".into()),
                role: Some("admin".into()),
                ..SessionUser::default()
            }),
        }
    }

    #[test]
    fn missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("none.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn save_and_reload_through_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions").join("default.json");

        let session = Session::new(Arc::new(FileTokenStore::new(&path)));
        session.set_tokens(tokens()).unwrap();
        assert!(path.exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"accessToken\": \"access-1\""));
        assert!(text.contains("\"refreshToken\": \"refresh-1\""));

        let restored = Session::new(Arc::new(FileTokenStore::new(&path)));
        assert!(restored.init().unwrap());
        assert_eq!(
            restored.user().and_then(|u| u.email).as_deref(),
            Some("desk@example.com")
        );

        restored.clear().unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("s.json"));
        store.save(&tokens()).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileTokenStore::new(&path).load().unwrap().is_none());
    }
}
