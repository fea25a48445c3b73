use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;

use super::cookies;
use super::error::GatewayError;
use super::state::GatewayState;
use super::upstream::IdentityProvider;
use crate::types::AccessClaims;

/// Verified user extracted from a bearer header or the session cookie.
///
/// For the app's own data routes (rosters, attendance records), which accept
/// either credential shape. Rejects with `401 Unauthorized`.
///
/// ```rust,ignore
/// async fn list_students(AuthUser(claims): AuthUser) -> impl IntoResponse {
///     format!("classes for {}", claims.user.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

impl<P: IdentityProvider> FromRequestParts<GatewayState<P>> for AuthUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState<P>,
    ) -> Result<Self, Self::Rejection> {
        // Native clients send a bearer header; web clients send the cookie.
        if let Some(token) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            return state
                .codec
                .verify_access(token)
                .map(AuthUser)
                .map_err(|_| GatewayError::Unauthenticated);
        }

        let token = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(cookies::parse_cookie_header)
            .and_then(|parsed| {
                parsed
                    .get(cookies::ACCESS_COOKIE_NAME)
                    .map(|c| c.value.clone())
            })
            .ok_or(GatewayError::Unauthenticated)?;

        state
            .codec
            .verify_access(&token)
            .map(AuthUser)
            .map_err(|_| GatewayError::Unauthenticated)
    }
}
