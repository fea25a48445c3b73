use std::collections::HashMap;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::token::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};

/// Name of the cookie holding the access token (path `/`).
pub const ACCESS_COOKIE_NAME: &str = "auth_token";

/// Name of the cookie holding the refresh token, scoped to the refresh
/// endpoint so it never rides along on ordinary requests.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

pub(super) const ACCESS_COOKIE_MAX_AGE: i64 = ACCESS_TOKEN_TTL;
pub(super) const REFRESH_COOKIE_MAX_AGE: i64 = REFRESH_TOKEN_TTL;
pub(super) const REFRESH_COOKIE_PATH: &str = "/api/auth/refresh";

pub(super) fn access_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE_NAME, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(ACCESS_COOKIE_MAX_AGE))
        .build()
}

pub(super) fn refresh_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::seconds(REFRESH_COOKIE_MAX_AGE))
        .build()
}

/// Removal cookie for the access token.
pub(super) fn clear_access_cookie() -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Removal cookie for the refresh token.
pub(super) fn clear_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::ZERO)
        .build()
}

/// A single cookie parsed from a `Cookie` request header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieEntry {
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub max_age: Option<i64>,
    pub expires: Option<String>,
}

/// Parse a `Cookie` header into a map from cookie name to entry.
///
/// Splits on `;`, then on the first `=` of each segment. Segments whose key
/// is a known cookie attribute (`Max-Age`, `Expires`, and the flag forms
/// `HttpOnly`/`Secure`) attach to the most recently seen cookie instead of
/// starting a new one, so the parser also accepts `Set-Cookie`-shaped
/// strings. Browsers send bare `name=value` pairs only.
#[must_use]
pub fn parse_cookie_header(header: &str) -> HashMap<String, CookieEntry> {
    let mut cookies: HashMap<String, CookieEntry> = HashMap::new();
    let mut last_name: Option<String> = None;

    for segment in header.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        match segment.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                match key.to_ascii_lowercase().as_str() {
                    "max-age" => {
                        if let Some(entry) = last_entry(&mut cookies, &last_name) {
                            entry.max_age = value.trim().parse().ok();
                        }
                    }
                    "expires" => {
                        if let Some(entry) = last_entry(&mut cookies, &last_name) {
                            entry.expires = Some(value.trim().to_owned());
                        }
                    }
                    "path" | "domain" | "samesite" => {}
                    _ => {
                        cookies.insert(
                            key.to_owned(),
                            CookieEntry {
                                value: value.to_owned(),
                                ..CookieEntry::default()
                            },
                        );
                        last_name = Some(key.to_owned());
                    }
                }
            }
            None => match segment.to_ascii_lowercase().as_str() {
                "httponly" => {
                    if let Some(entry) = last_entry(&mut cookies, &last_name) {
                        entry.http_only = true;
                    }
                }
                "secure" => {
                    if let Some(entry) = last_entry(&mut cookies, &last_name) {
                        entry.secure = true;
                    }
                }
                _ => {}
            },
        }
    }

    cookies
}

fn last_entry<'a>(
    cookies: &'a mut HashMap<String, CookieEntry>,
    last_name: &Option<String>,
) -> Option<&'a mut CookieEntry> {
    last_name.as_ref().and_then(|name| cookies.get_mut(name))
}
