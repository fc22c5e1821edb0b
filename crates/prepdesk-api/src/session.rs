// Session service
//
// Process-wide auth state as an injected, cloneable handle rather than a
// module-level singleton. Lifecycle: `init()` hydrates from a `TokenStore`,
// `set_tokens()` (login / refresh) mutates, `clear()` tears down on logout.
// Every mutation bumps a generation counter; the HTTP client uses it to
// tell whether a concurrent request already refreshed the access token.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// The logged-in user as reported by the auth endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// `superadmin`, `admin`, or `student`.
    #[serde(default)]
    pub role: Option<String>,
}

/// Bearer credentials for the authenticated API surface.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user: Option<SessionUser>,
}

/// Persistence for session tokens across process runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionTokens>, Error>;
    fn save(&self, tokens: &SessionTokens) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// Volatile store. Useful for tests and one-shot invocations.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<SessionTokens>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SessionTokens>, Error> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, tokens: &SessionTokens) -> Result<(), Error> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Shared session handle. Cheaply cloneable via `Arc<SessionInner>`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<SessionState>,
    store: Arc<dyn TokenStore>,
    /// Serializes token refreshes: one in flight, everyone else queues.
    refresh_lock: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct SessionState {
    tokens: Option<SessionTokens>,
    generation: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an empty session backed by `store`. Call [`init()`](Self::init)
    /// to hydrate previously persisted tokens.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::default()),
                store,
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// A session that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::default()))
    }

    /// Hydrate tokens from the backing store. Returns whether a session was found.
    pub fn init(&self) -> Result<bool, Error> {
        let loaded = self.inner.store.load()?;
        let found = loaded.is_some();
        let mut state = self.write_state();
        state.tokens = loaded;
        state.generation += 1;
        debug!(found, "session hydrated from token store");
        Ok(found)
    }

    /// Replace the current tokens (login or refresh) and persist them.
    pub fn set_tokens(&self, tokens: SessionTokens) -> Result<(), Error> {
        self.inner.store.save(&tokens)?;
        let mut state = self.write_state();
        state.tokens = Some(tokens);
        state.generation += 1;
        Ok(())
    }

    /// Forget the session both in memory and in the store.
    pub fn clear(&self) -> Result<(), Error> {
        {
            let mut state = self.write_state();
            state.tokens = None;
            state.generation += 1;
        }
        self.inner.store.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().tokens.is_some()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read_state()
            .tokens
            .as_ref()
            .and_then(|t| t.user.clone())
    }

    /// Current access token together with the generation it belongs to.
    pub(crate) fn access(&self) -> Option<(SecretString, u64)> {
        let state = self.read_state();
        state
            .tokens
            .as_ref()
            .map(|t| (t.access_token.clone(), state.generation))
    }

    pub(crate) fn refresh_token(&self) -> Option<SecretString> {
        self.read_state()
            .tokens
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.read_state().generation
    }

    pub(crate) fn refresh_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.inner.refresh_lock
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
