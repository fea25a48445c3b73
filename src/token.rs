use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::TokenError;
use crate::types::{AccessClaims, RefreshClaims, UserClaims, REFRESH_TOKEN_USE};

/// Access token lifetime in seconds (1 hour).
pub const ACCESS_TOKEN_TTL: i64 = 60 * 60;

/// Refresh token lifetime in seconds (7 days).
pub const REFRESH_TOKEN_TTL: i64 = 7 * 24 * 60 * 60;

/// Signs and verifies the app's HS256 session tokens.
///
/// One codec per process, constructed from the single signing secret. The
/// functions here are pure given that secret; no state is kept between calls.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign an access token with the given lifetime in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the claims cannot be serialized.
    pub fn sign_access(&self, user: &UserClaims, ttl: i64) -> Result<String, TokenError> {
        let iat = unix_now();
        let claims = AccessClaims {
            user: user.clone(),
            iat,
            exp: iat + ttl,
        };
        self.sign(&claims)
    }

    /// Sign a refresh token carrying the given rotation id.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the claims cannot be serialized.
    pub fn sign_refresh(
        &self,
        user: &UserClaims,
        jti: impl Into<String>,
        ttl: i64,
    ) -> Result<String, TokenError> {
        let iat = unix_now();
        let claims = RefreshClaims {
            user: user.clone(),
            jti: jti.into(),
            token_use: REFRESH_TOKEN_USE.into(),
            iat,
            exp: iat + ttl,
        };
        self.sign(&claims)
    }

    /// Verify an access token's signature and expiry.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] if `exp` has passed, [`TokenError::Invalid`]
    /// for a bad signature, malformed token, or empty subject.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.verify(token)?;
        if claims.user.sub.is_empty() {
            return Err(TokenError::Invalid("empty subject".into()));
        }
        Ok(claims)
    }

    /// Verify a refresh token: signature, expiry, and the `type: "refresh"`
    /// discriminator. An access token presented here fails verification.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] / [`TokenError::Invalid`] as for
    /// [`verify_access`](Self::verify_access).
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token)?;
        if claims.token_use != REFRESH_TOKEN_USE {
            return Err(TokenError::Invalid(format!(
                "unexpected token type: {}",
                claims.token_use
            )));
        }
        if claims.user.sub.is_empty() {
            return Err(TokenError::Invalid("empty subject".into()));
        }
        Ok(claims)
    }

    /// Decode a token WITHOUT verifying its signature or expiry.
    ///
    /// For optimistic local inspection only (e.g. checking `exp` before
    /// deciding whether to refresh). Never an authorization decision.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the token is structurally
    /// malformed.
    pub fn decode_unverified(token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        // The default 60s leeway would accept freshly-expired tokens.
        validation.leeway = 0;

        jsonwebtoken::decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

pub(crate) fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
