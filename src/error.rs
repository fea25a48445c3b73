/// Errors produced by the token codec.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    /// The expiry timestamp has passed. The signature itself may be valid.
    #[error("token expired")]
    Expired,
    /// Bad signature, malformed structure, or claims that violate the
    /// token's contract (empty subject, wrong `type`).
    #[error("invalid token: {0}")]
    Invalid(String),
}
