use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Client platform, derived by the gateway from which registered
/// `redirect_uri` the caller presented.
///
/// Web clients hold their tokens in HTTP-only cookies set by the gateway;
/// every other client receives tokens in the response body and stores them
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Native,
    Web,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Web => "web",
        }
    }

    #[must_use]
    pub fn is_web(self) -> bool {
        matches!(self, Self::Web)
    }

    /// Platform declared in a request parameter. Only an exact `"web"`
    /// selects cookie handling; everything else, including an absent
    /// parameter, gets body-token treatment.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("web") => Self::Web,
            _ => Self::Native,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "native" | "mobile" => Ok(Self::Native),
            other => Err(UnknownPlatform(other.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(String);

/// Profile claims carried inside every app token.
///
/// `sub` comes from the upstream identity token and is the sole stable user
/// identifier. The two `provider_*` fields are Google's own tokens, embedded
/// so that spreadsheet calls can be made on the user's behalf without a
/// second credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_refresh_token: Option<String>,
}

impl UserClaims {
    /// Claims with only the required subject set.
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_provider_tokens(
        mut self,
        access: impl Into<String>,
        refresh: Option<String>,
    ) -> Self {
        self.provider_access_token = Some(access.into());
        self.provider_refresh_token = refresh;
        self
    }
}

/// Payload of a signed access token: profile claims plus the standard time
/// fields. Expires after [`crate::token::ACCESS_TOKEN_TTL`] seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub user: UserClaims,
    pub iat: i64,
    pub exp: i64,
}

/// Payload of a signed refresh token.
///
/// Carries a random `jti` so individual refresh tokens can be revoked later,
/// a `type` discriminator so an access token can never be replayed against
/// the refresh endpoint, and enough profile claims to re-mint an access
/// token without an upstream round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub user: UserClaims,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_use: String,
    pub iat: i64,
    pub exp: i64,
}

/// Discriminator value carried in every refresh token's `type` claim.
pub const REFRESH_TOKEN_USE: &str = "refresh";

/// Token pair returned to non-web clients by the token and refresh
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Acknowledgment returned to web clients, whose tokens travel in
/// `Set-Cookie` headers instead of the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAck {
    pub success: bool,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Body of a successful session check: the verified access-token claims
/// plus the absolute expiry of the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(flatten)]
    pub claims: AccessClaims,
    #[serde(rename = "cookieExpiration")]
    pub cookie_expiration: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parses_both_spellings() {
        assert_eq!("web".parse::<Platform>().unwrap(), Platform::Web);
        assert_eq!("native".parse::<Platform>().unwrap(), Platform::Native);
        assert_eq!("mobile".parse::<Platform>().unwrap(), Platform::Native);
        assert!("desktop".parse::<Platform>().is_err());
    }

    #[test]
    fn from_param_defaults_everything_but_web_to_native() {
        assert_eq!(Platform::from_param(Some("web")), Platform::Web);
        assert_eq!(Platform::from_param(Some("native")), Platform::Native);
        assert_eq!(Platform::from_param(Some("ios")), Platform::Native);
        assert_eq!(Platform::from_param(None), Platform::Native);
    }

    #[test]
    fn platform_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Platform::Web).unwrap(), "\"web\"");
        let p: Platform = serde_json::from_str("\"native\"").unwrap();
        assert_eq!(p, Platform::Native);
    }

    #[test]
    fn user_claims_skip_absent_fields() {
        let claims = UserClaims::new("user-1").with_email("u@example.com");
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "user-1");
        assert_eq!(json["email"], "u@example.com");
        assert!(json.get("picture").is_none());
        assert!(json.get("provider_access_token").is_none());
    }

    #[test]
    fn refresh_claims_use_type_on_the_wire() {
        let claims = RefreshClaims {
            user: UserClaims::new("user-1"),
            jti: "abc".into(),
            token_use: REFRESH_TOKEN_USE.into(),
            iat: 100,
            exp: 200,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "refresh");
        assert_eq!(json["jti"], "abc");
        assert_eq!(json["sub"], "user-1");
    }

    #[test]
    fn access_claims_flatten_profile_fields() {
        let claims = AccessClaims {
            user: UserClaims::new("user-1").with_name("Ada"),
            iat: 100,
            exp: 3700,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "user-1");
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["exp"], 3700);

        let back: AccessClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
    }
}
