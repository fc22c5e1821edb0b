// Session authentication endpoints
//
// Email/password login, best-effort logout, and the current-user lookup.
// Tokens land in the client's attached `Session`; subsequent
// `Access::Authenticated` calls pick them up automatically.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{Access, ApiClient, TokenResponse, parse_response};
use crate::error::Error;
use crate::session::{SessionTokens, SessionUser};

const LOGIN_PATH: &str = "auth/login";
const LOGOUT_PATH: &str = "auth/logout";
const ME_PATH: &str = "auth/me";

/// `/auth/me` answers either `{ "user": {...} }` or the bare user object.
#[derive(Deserialize)]
#[serde(untagged)]
enum MeResponse {
    Wrapped { user: SessionUser },
    Bare(SessionUser),
}

impl ApiClient {
    /// Authenticate with email/password and store the issued tokens in the
    /// attached session.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<SessionUser>, Error> {
        let session = self.session().ok_or(Error::NotAuthenticated)?;
        let url = self.api_url(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let resp = self
            .http()
            .post(url)
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .map_err(Error::Transport)?;

        let tokens: TokenResponse = match parse_response(resp).await {
            Ok(tokens) => tokens,
            Err(Error::Api {
                status: 400 | 401 | 403,
                message,
            }) => {
                return Err(Error::Authentication {
                    message: message.unwrap_or_else(|| "invalid email or password".into()),
                });
            }
            Err(e) => return Err(e),
        };

        let user = tokens.user.clone();
        session.set_tokens(SessionTokens {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens.refresh_token.map(SecretString::from),
            user: tokens.user,
        })?;

        debug!("login successful");
        Ok(user)
    }

    /// End the session. The server call is best effort; local tokens are
    /// always discarded.
    pub async fn logout(&self) -> Result<(), Error> {
        let session = self.session().ok_or(Error::NotAuthenticated)?;

        if session.is_authenticated() {
            let result: Result<serde_json::Value, Error> = self
                .send_json::<_, ()>(Method::POST, LOGOUT_PATH, None, Access::Authenticated)
                .await;
            if let Err(e) = result {
                debug!(error = %e, "server-side logout failed (ignored)");
            }
        }

        session.clear()?;
        debug!("logout complete");
        Ok(())
    }

    /// Fetch the currently authenticated user.
    pub async fn me(&self) -> Result<SessionUser, Error> {
        let resp: MeResponse = self
            .send_json::<_, ()>(Method::GET, ME_PATH, None, Access::Authenticated)
            .await?;
        Ok(match resp {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        })
    }
}
