//! The session manager: client half of the auth core.
//!
//! One [`SessionManager`] per running shell owns the single [`Session`]
//! source of truth. It restores state at startup, drives the browser-based
//! sign-in handoff, refreshes expiring tokens behind an in-flight guard,
//! and wraps outgoing requests so a `401` triggers exactly one refresh and
//! one retry.

mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use reqwest::StatusCode;
use url::Url;

pub use store::{BrowserStore, KeyringStore, MemoryStore, StoreError, TokenKey, TokenStore};

use crate::error::TokenError;
use crate::pkce;
use crate::token::{unix_now, TokenCodec};
use crate::types::{Platform, SessionInfo, TokenPair, UserClaims};

/// Scopes requested at sign-in: identity plus spreadsheet access for the
/// attendance data calls made on the user's behalf.
const SIGN_IN_SCOPES: &str = "openid profile email https://www.googleapis.com/auth/spreadsheets";

/// The authenticated state of one running client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserClaims>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Errors surfaced by the session manager.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The gateway rejected the credential; the session has been cleared.
    #[error("not authorized")]
    Unauthorized,
    /// The state echoed back through the redirect does not match what this
    /// client sent.
    #[error("authorization state mismatch")]
    StateMismatch,
    /// The gateway answered the exchange with a non-success status.
    #[error("token exchange failed with status {status}: {detail}")]
    Exchange { status: u16, detail: String },
    #[error("token store error: {0}")]
    Storage(String),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Everything the shell needs to launch the browser-based sign-in:
/// the authorize URL to open, plus the state and PKCE verifier to hold on
/// to until the redirect comes back.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Client-side session orchestrator.
///
/// All methods take `&self`; state lives behind a mutex so the manager can
/// be shared across tasks.
pub struct SessionManager<S> {
    platform: Platform,
    base_url: Url,
    redirect_uri: String,
    http: reqwest::Client,
    store: S,
    session: Mutex<Session>,
    refresh_in_flight: AtomicBool,
    sign_in_error: Mutex<Option<String>>,
}

impl<S: TokenStore> SessionManager<S> {
    /// Create a manager for the given platform against a gateway origin.
    ///
    /// Web managers get a cookie-enabled HTTP client so gateway-set session
    /// cookies ride along automatically.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Http`] if the HTTP client cannot be built.
    pub fn new(platform: Platform, base_url: Url, store: S) -> Result<Self, SessionError> {
        let mut builder = reqwest::Client::builder();
        if platform.is_web() {
            builder = builder.cookie_store(true);
        }
        let http = builder.build()?;
        let redirect_uri = base_url.as_str().trim_end_matches('/').to_owned();

        Ok(Self {
            platform,
            base_url,
            redirect_uri,
            http,
            store,
            session: Mutex::new(Session::default()),
            refresh_in_flight: AtomicBool::new(false),
            sign_in_error: Mutex::new(None),
        })
    }

    /// Override the redirect URI announced at sign-in. Native shells pass
    /// their deep-link scheme here; web shells keep the default (the
    /// gateway origin).
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.locked().clone()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserClaims> {
        self.locked().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.locked().is_authenticated()
    }

    /// The last sign-in failure, kept until the next successful sign-in.
    #[must_use]
    pub fn sign_in_error(&self) -> Option<String> {
        self.sign_in_error.lock().expect("error lock poisoned").clone()
    }

    /// The manager's HTTP client, for building requests to pass to
    /// [`fetch_with_auth`](Self::fetch_with_auth).
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Restore the session at startup.
    ///
    /// Web: ask the gateway whether the session cookie is still good, then
    /// fall back to a silent refresh. Native: adopt a still-valid stored
    /// access token directly, otherwise refresh with the stored refresh
    /// token. With nothing stored the manager settles into the
    /// unauthenticated state without error; network failures here are
    /// logged, never fatal.
    pub async fn restore(&self) {
        if self.platform.is_web() {
            self.restore_web().await;
        } else {
            self.restore_native().await;
        }
    }

    async fn restore_web(&self) {
        match self.fetch_session_info().await {
            Ok(info) => self.adopt_web(info),
            Err(e) => {
                tracing::debug!(error = %e, "no active web session");
                if let Err(e) = self.refresh().await {
                    tracing::debug!(error = %e, "silent refresh failed at startup");
                }
            }
        }
    }

    async fn restore_native(&self) {
        let access = self.retrieve_quietly(TokenKey::Access).await;
        let refresh = self.retrieve_quietly(TokenKey::Refresh).await;

        if let Some(token) = access {
            if let Ok(claims) = TokenCodec::decode_unverified(&token) {
                if claims.exp > unix_now() {
                    // Still valid: adopt it without a refresh round-trip.
                    let mut session = self.locked();
                    session.user = Some(claims.user);
                    session.access_token = Some(token);
                    session.refresh_token = refresh;
                    return;
                }
            }
        }

        // Access token absent, expired, or undecodable.
        if let Some(refresh) = refresh {
            self.locked().refresh_token = Some(refresh);
            if let Err(e) = self.refresh().await {
                tracing::debug!(error = %e, "silent refresh failed at startup");
            }
        }
    }

    async fn retrieve_quietly(&self, key: TokenKey) -> Option<String> {
        match self.store.retrieve(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "token store read failed");
                None
            }
        }
    }

    /// Build the authorize URL and the secrets the shell must hold across
    /// the browser handoff.
    #[must_use]
    pub fn begin_sign_in(&self) -> SignInRequest {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);

        let mut url = self.endpoint("/api/auth/authorize");
        url.query_pairs_mut()
            .append_pair("client_id", "google")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &state)
            .append_pair("scope", SIGN_IN_SCOPES)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        SignInRequest {
            url: url.into(),
            state,
            code_verifier,
        }
    }

    /// Finish sign-in with the code delivered by the redirect.
    ///
    /// Verifies the echoed state against the one from
    /// [`begin_sign_in`](Self::begin_sign_in) before exchanging the code.
    /// On failure the existing session, if any, is left untouched and the
    /// error is also recorded on [`sign_in_error`](Self::sign_in_error).
    ///
    /// # Errors
    ///
    /// [`SessionError::StateMismatch`], [`SessionError::Exchange`], or a
    /// transport/storage error.
    pub async fn complete_sign_in(
        &self,
        code: &str,
        returned_state: &str,
        request: &SignInRequest,
    ) -> Result<(), SessionError> {
        if returned_state != request.state {
            tracing::warn!("authorization state mismatch");
            return Err(self.record_sign_in_error(SessionError::StateMismatch));
        }

        let response = match self
            .http
            .post(self.endpoint("/api/auth/token"))
            .form(&[
                ("code", code),
                ("platform", self.platform.as_str()),
                ("code_verifier", request.code_verifier.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.record_sign_in_error(e.into())),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(self.record_sign_in_error(SessionError::Exchange { status, detail }));
        }

        let result = if self.platform.is_web() {
            // Tokens arrived as cookies; the session check tells us who we are.
            match self.fetch_session_info().await {
                Ok(info) => {
                    self.adopt_web(info);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        } else {
            match response.json::<TokenPair>().await {
                Ok(pair) => self.adopt_native(pair).await.map(|_| ()),
                Err(e) => Err(e.into()),
            }
        };

        match result {
            Ok(()) => {
                *self.sign_in_error.lock().expect("error lock poisoned") = None;
                tracing::info!("sign-in completed");
                Ok(())
            }
            Err(e) => Err(self.record_sign_in_error(e)),
        }
    }

    /// Refresh the session's tokens.
    ///
    /// Guarded by an in-flight flag: a call made while another refresh is
    /// outstanding performs no work and returns `Ok(None)` immediately.
    /// A `401` from the gateway forces sign-out. Returns the new access
    /// token for native clients; web clients get `Ok(None)` because their
    /// tokens are re-set server-side.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unauthorized`] after a forced sign-out, or a
    /// transport/exchange error (session kept).
    pub async fn refresh(&self) -> Result<Option<String>, SessionError> {
        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("refresh already in flight, skipping");
            return Ok(None);
        }
        let _reset = ResetGuard(&self.refresh_in_flight);

        if self.platform.is_web() {
            self.refresh_web().await
        } else {
            self.refresh_native().await
        }
    }

    async fn refresh_web(&self) -> Result<Option<String>, SessionError> {
        let response = self
            .http
            .post(self.endpoint("/api/auth/refresh"))
            .json(&serde_json::json!({ "platform": "web" }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.sign_out().await;
            return Err(SessionError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(SessionError::Exchange { status, detail });
        }

        let info = self.fetch_session_info().await?;
        self.adopt_web(info);
        Ok(None)
    }

    async fn refresh_native(&self) -> Result<Option<String>, SessionError> {
        let refresh_token = self.locked().refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            self.sign_out().await;
            return Err(SessionError::Unauthorized);
        };

        let response = self
            .http
            .post(self.endpoint("/api/auth/refresh"))
            .json(&serde_json::json!({
                "platform": "native",
                "refreshToken": refresh_token,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.sign_out().await;
            return Err(SessionError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(SessionError::Exchange { status, detail });
        }

        let pair: TokenPair = response.json().await?;
        let access_token = pair.access_token.clone();
        self.adopt_native(pair).await?;
        Ok(Some(access_token))
    }

    /// Send a request with the session's credentials attached.
    ///
    /// On a `401` response the manager refreshes once and retries the
    /// request once with updated credentials; it never retries a second
    /// time. If the refresh itself fails, the original `401` response is
    /// handed back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Http`] only for transport failures;
    /// non-success statuses are returned as responses.
    pub async fn fetch_with_auth(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SessionError> {
        let retry = request.try_clone();
        let response = self.send_with_credentials(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("request got 401, refreshing once");
        let Some(retry) = retry else {
            return Ok(response);
        };
        if self.refresh().await.is_err() {
            return Ok(response);
        }
        self.send_with_credentials(retry).await
    }

    async fn send_with_credentials(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SessionError> {
        // Web credentials are cookies, already in the client's jar.
        let request = if self.platform.is_web() {
            request
        } else {
            match self.locked().access_token.clone() {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        };
        request.send().await.map_err(Into::into)
    }

    /// Sign out and clear the in-memory session.
    ///
    /// Web managers tell the gateway to drop its cookies; native managers
    /// delete both stored tokens. The in-memory session is cleared even
    /// when either of those fails.
    pub async fn sign_out(&self) {
        if self.platform.is_web() {
            if let Err(e) = self
                .http
                .post(self.endpoint("/api/auth/logout"))
                .send()
                .await
            {
                tracing::warn!(error = %e, "logout request failed");
            }
        } else {
            for key in [TokenKey::Access, TokenKey::Refresh] {
                if let Err(e) = self.store.delete(key).await {
                    tracing::warn!(key = key.as_str(), error = %e, "failed to delete stored token");
                }
            }
        }

        self.locked().clear();
    }

    // ── Internals ──────────────────────────────────────────────────

    fn locked(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session lock poisoned")
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url.join(path).expect("valid endpoint path")
    }

    fn record_sign_in_error(&self, error: SessionError) -> SessionError {
        *self.sign_in_error.lock().expect("error lock poisoned") = Some(error.to_string());
        error
    }

    async fn fetch_session_info(&self) -> Result<SessionInfo, SessionError> {
        let response = self
            .http
            .get(self.endpoint("/api/auth/session"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SessionError::Unauthorized);
        }
        Ok(response.json().await?)
    }

    fn adopt_web(&self, info: SessionInfo) {
        let mut session = self.locked();
        session.user = Some(info.claims.user);
        // The tokens themselves stay in HTTP-only cookies.
        session.access_token = None;
        session.refresh_token = None;
    }

    async fn adopt_native(&self, pair: TokenPair) -> Result<(), SessionError> {
        self.store
            .persist(TokenKey::Access, pair.access_token.clone())
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        self.store
            .persist(TokenKey::Refresh, pair.refresh_token.clone())
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        let claims = TokenCodec::decode_unverified(&pair.access_token)?;
        let mut session = self.locked();
        session.user = Some(claims.user);
        session.access_token = Some(pair.access_token);
        session.refresh_token = Some(pair.refresh_token);
        Ok(())
    }
}

/// Clears the refresh in-flight flag when the refresh future completes or
/// is dropped.
struct ResetGuard<'a>(&'a AtomicBool);

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
