use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use super::config::GatewayConfig;
use super::cookies;
use super::error::GatewayError;
use super::state::GatewayState;
use super::types::AuthorizationState;
use super::upstream::{GoogleProvider, IdentityProvider};
use crate::token::{TokenCodec, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
use crate::types::{Platform, SessionInfo, TokenAck, TokenPair, UserClaims};

/// The one internal client identifier the gateway recognizes.
const INTERNAL_CLIENT_ID: &str = "google";

/// Create the authorization gateway router backed by Google.
#[must_use]
pub fn auth_routes(config: GatewayConfig) -> Router {
    let provider = GoogleProvider::new(&config);
    auth_routes_with(config, provider)
}

/// Create the gateway router with a custom identity provider.
#[must_use]
pub fn auth_routes_with<P: IdentityProvider>(config: GatewayConfig, provider: P) -> Router {
    auth_routes_from(GatewayState::new(config, provider))
}

/// Create the gateway router on an existing shared state.
#[must_use]
pub fn auth_routes_from<P: IdentityProvider>(state: GatewayState<P>) -> Router {
    Router::new()
        .route("/api/auth/authorize", get(authorize::<P>))
        .route("/api/auth/callback", get(callback::<P>))
        .route("/api/auth/token", post(token::<P>))
        .route("/api/auth/session", get(session::<P>))
        .route("/api/auth/refresh", post(refresh::<P>))
        .route("/api/auth/logout", post(logout::<P>))
        .with_state(state)
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

// ── Authorize ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AuthorizeParams {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    state: Option<String>,
    scope: Option<String>,
}

async fn authorize<P: IdentityProvider>(
    State(state): State<GatewayState<P>>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, GatewayError> {
    let config = &state.config;

    let platform = match params.redirect_uri.as_deref() {
        Some(uri) if uri == config.app_scheme => Platform::Native,
        Some(uri) if uri.trim_end_matches('/') == config.base_url.as_str().trim_end_matches('/') => {
            Platform::Web
        }
        _ => return Err(GatewayError::InvalidRedirect),
    };

    if params.client_id.as_deref() != Some(INTERNAL_CLIENT_ID) {
        return Err(GatewayError::InvalidClient);
    }

    let combined = AuthorizationState::new(platform, params.state.unwrap_or_default());
    let scope = params
        .scope
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.scopes.join(" "));

    let mut url = config.auth_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("response_type", "code")
        .append_pair("scope", &scope)
        .append_pair("state", &combined.to_string())
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(found(url.as_str()))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<P: IdentityProvider>(
    State(state): State<GatewayState<P>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, GatewayError> {
    let combined = params.state.ok_or(GatewayError::InvalidState)?;
    let auth_state =
        AuthorizationState::decode(&combined).ok_or(GatewayError::InvalidState)?;

    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "upstream returned an error at callback");
    }

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("code", params.code.as_deref().unwrap_or_default());
    // The caller's own state goes back untouched; the client compares it
    // against what it sent.
    query.append_pair("state", &auth_state.caller_state);
    if let Some(error) = &params.error {
        query.append_pair("error", error);
        if let Some(description) = &params.error_description {
            query.append_pair("error_description", description);
        }
    }

    let config = &state.config;
    let target = match auth_state.platform {
        Platform::Web => config.base_url.as_str().trim_end_matches('/'),
        Platform::Native => config.app_scheme.as_str(),
    };

    Ok(found(&format!("{target}?{}", query.finish())))
}

// ── Token exchange ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenForm {
    code: Option<String>,
    platform: Option<String>,
    // Sent by PKCE-aware clients; the upstream exchange is authenticated by
    // the client secret, so the verifier is accepted and not forwarded.
    #[allow(dead_code)]
    code_verifier: Option<String>,
}

async fn token<P: IdentityProvider>(
    State(state): State<GatewayState<P>>,
    Form(form): Form<TokenForm>,
) -> Result<Response, GatewayError> {
    let code = form
        .code
        .filter(|c| !c.is_empty())
        .ok_or(GatewayError::MissingCode)?;
    let platform = Platform::from_param(form.platform.as_deref());

    let upstream = state.provider.exchange_code(&code).await?;

    if let Some(code) = upstream.error {
        tracing::warn!(error = %code, "upstream rejected the code exchange");
        return Err(GatewayError::Upstream {
            code,
            description: upstream.error_description,
        });
    }

    let (Some(id_token), Some(provider_access)) = (upstream.id_token, upstream.access_token)
    else {
        return Err(GatewayError::IncompleteUpstreamResponse);
    };

    // The identity token arrived over the provider's TLS channel; its claims
    // are decoded without a signature check.
    let identity = TokenCodec::decode_unverified(&id_token)
        .map_err(|_| GatewayError::IncompleteUpstreamResponse)?;
    if identity.user.sub.is_empty() {
        return Err(GatewayError::IncompleteUpstreamResponse);
    }

    let mut user = identity.user;
    user.provider_access_token = Some(provider_access);
    user.provider_refresh_token = upstream.refresh_token;

    tracing::info!(sub = %user.sub, platform = %platform, "token exchange succeeded");
    issue_tokens(&state, platform, &user)
}

// ── Session check ──────────────────────────────────────────────────

async fn session<P: IdentityProvider>(
    State(state): State<GatewayState<P>>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>, GatewayError> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::Unauthenticated)?;

    let parsed = cookies::parse_cookie_header(cookie_header);
    let entry = parsed
        .get(cookies::ACCESS_COOKIE_NAME)
        .filter(|c| !c.value.is_empty())
        .ok_or(GatewayError::Unauthenticated)?;

    let claims = state
        .codec
        .verify_access(&entry.value)
        .map_err(|_| GatewayError::Unauthenticated)?;

    // Browsers do not echo cookie attributes, so the configured max-age
    // stands in when the header carries none.
    let max_age = entry.max_age.unwrap_or(cookies::ACCESS_COOKIE_MAX_AGE);
    Ok(Json(SessionInfo {
        cookie_expiration: claims.iat + max_age,
        claims,
    }))
}

// ── Refresh ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    platform: Option<String>,
    refresh_token: Option<String>,
}

async fn refresh<P: IdentityProvider>(
    State(state): State<GatewayState<P>>,
    headers: HeaderMap,
    Json(body): Json<RefreshBody>,
) -> Result<Response, GatewayError> {
    let platform = Platform::from_param(body.platform.as_deref());

    let token = if platform.is_web() {
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(cookies::parse_cookie_header)
            .and_then(|parsed| {
                parsed
                    .get(cookies::REFRESH_COOKIE_NAME)
                    .map(|c| c.value.clone())
            })
    } else {
        body.refresh_token
    };
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::Unauthenticated)?;

    let claims = state.codec.verify_refresh(&token).map_err(|e| {
        tracing::debug!(error = %e, "refresh token rejected");
        GatewayError::Unauthenticated
    })?;

    issue_tokens(&state, platform, &claims.user)
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<P: IdentityProvider>(
    State(_state): State<GatewayState<P>>,
) -> (CookieJar, Json<serde_json::Value>) {
    let jar = CookieJar::new()
        .add(cookies::clear_access_cookie())
        .add(cookies::clear_refresh_cookie());
    (jar, Json(serde_json::json!({ "success": true })))
}

// ── Helpers ────────────────────────────────────────────────────────

/// Mint a fresh access/refresh pair and package it for the platform: cookies
/// plus a small acknowledgment for web, the pair itself for everyone else.
fn issue_tokens<P>(
    state: &GatewayState<P>,
    platform: Platform,
    user: &UserClaims,
) -> Result<Response, GatewayError> {
    let access_token = state.codec.sign_access(user, ACCESS_TOKEN_TTL)?;
    let refresh_token =
        state
            .codec
            .sign_refresh(user, Uuid::new_v4().to_string(), REFRESH_TOKEN_TTL)?;

    if platform.is_web() {
        let issued_at = TokenCodec::decode_unverified(&access_token)?.iat;
        let jar = CookieJar::new()
            .add(cookies::access_cookie(
                access_token,
                state.config.secure_cookies,
            ))
            .add(cookies::refresh_cookie(
                refresh_token,
                state.config.secure_cookies,
            ));
        let ack = TokenAck {
            success: true,
            issued_at,
            expires_at: issued_at + cookies::ACCESS_COOKIE_MAX_AGE,
        };
        Ok((jar, Json(ack)).into_response())
    } else {
        Ok(Json(TokenPair {
            access_token,
            refresh_token,
        })
        .into_response())
    }
}
