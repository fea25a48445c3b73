#![doc = include_str!("../README.md")]

pub mod error;
#[cfg(feature = "gateway")]
pub mod gateway;
pub mod pkce;
#[cfg(feature = "client")]
pub mod session;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use error::TokenError;
#[cfg(feature = "gateway")]
pub use gateway::{
    auth_routes, auth_routes_with, AuthUser, GatewayConfig, GatewayError, GoogleProvider,
    IdentityProvider,
};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state};
#[cfg(feature = "client")]
pub use session::{
    BrowserStore, KeyringStore, MemoryStore, Session, SessionError, SessionManager,
    SignInRequest, TokenKey, TokenStore,
};
pub use token::{TokenCodec, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
pub use types::{AccessClaims, Platform, RefreshClaims, SessionInfo, TokenAck, TokenPair, UserClaims};
