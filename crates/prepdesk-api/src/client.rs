// Shared HTTP client
//
// Wraps `reqwest::Client` with base-URL construction, JSON error-body
// extraction, and bearer-token injection. Authenticated requests that come
// back 401 trigger a single-flight token refresh followed by exactly one
// retry. Public requests (the kiosk attendance endpoint) are sent once and
// never carry a bearer token.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::session::{Session, SessionTokens, SessionUser};
use crate::transport::TransportConfig;

const REFRESH_PATH: &str = "auth/refresh-token";

/// How a request is authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No bearer token, no refresh, single attempt.
    Public,
    /// Bearer token from the session; 401 triggers refresh-and-retry once.
    Authenticated,
}

/// Error bodies come back as `{"message": "..."}` or `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Token payload returned by login and refresh.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

/// HTTP client for the institute API.
///
/// Cheap to clone; the underlying `reqwest::Client` and [`Session`] are
/// both reference-counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Option<Session>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`. `base_url` is the API root,
    /// e.g. `https://desk.example.com/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session: None,
        }
    }

    /// Attach a session; required for [`Access::Authenticated`] calls.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (for flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}` without dropping any base path segment.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and decode a JSON response body.
    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        access: Access,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.api_url(path)?;
        debug!(%method, %url, ?access, "sending request");

        match access {
            Access::Public => {
                let resp = self.request(method, url, body, None).send().await?;
                parse_response(resp).await
            }
            Access::Authenticated => {
                let session = self.session.as_ref().ok_or(Error::NotAuthenticated)?;
                let (token, generation) = session.access().ok_or(Error::NotAuthenticated)?;

                let resp = self
                    .request(method.clone(), url.clone(), body, Some(&token))
                    .send()
                    .await?;
                if resp.status() != StatusCode::UNAUTHORIZED {
                    return parse_response(resp).await;
                }

                debug!("access token rejected, refreshing");
                let token = self.refresh_access(session, generation).await?;
                let resp = self
                    .request(method, url, body, Some(&token))
                    .send()
                    .await?;
                parse_response(resp).await
            }
        }
    }

    fn request<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        bearer: Option<&SecretString>,
    ) -> reqwest::RequestBuilder
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.http.request(method, url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    /// Obtain a fresh access token, refreshing at most once across
    /// concurrent callers.
    ///
    /// `seen_generation` is the session generation the caller's rejected
    /// token belonged to. Callers queue on the refresh lock; whoever finds
    /// the generation already moved on reuses the new token instead of
    /// refreshing again.
    async fn refresh_access(
        &self,
        session: &Session,
        seen_generation: u64,
    ) -> Result<SecretString, Error> {
        let _guard = session.refresh_lock().lock().await;

        if let Some((token, generation)) = session.access() {
            if generation != seen_generation {
                trace!(generation, "token refreshed by a concurrent request");
                return Ok(token);
            }
        }

        let Some(refresh_token) = session.refresh_token() else {
            session.clear()?;
            return Err(Error::SessionExpired);
        };

        let url = self.api_url(REFRESH_PATH)?;
        debug!(%url, "refreshing access token");
        let resp = self
            .http
            .post(url)
            .json(&json!({ "refreshToken": refresh_token.expose_secret() }))
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "token refresh rejected, ending session");
            session.clear()?;
            return Err(Error::SessionExpired);
        }

        let refreshed: TokenResponse = parse_response(resp).await?;
        let access = SecretString::from(refreshed.access_token);
        session.set_tokens(SessionTokens {
            access_token: access.clone(),
            refresh_token: refreshed
                .refresh_token
                .map(SecretString::from)
                .or(Some(refresh_token)),
            user: refreshed.user.or_else(|| session.user()),
        })?;
        debug!("access token refreshed");
        Ok(access)
    }
}

// ── Response parsing ─────────────────────────────────────────────────

/// Decode a JSON body on success, or turn the status + error body into
/// [`Error::Api`].
pub(crate) async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
