//! The authorization gateway: backend half of the auth core.
//!
//! Implements the OAuth2 redirect dance against the upstream identity
//! provider and layers the app's own short-lived session tokens on top.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rollbook_auth::gateway::{auth_routes, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! let app = axum::Router::new()
//!     .merge(auth_routes(config));
//! ```
//!
//! # Endpoints
//!
//! | route | role |
//! | --- | --- |
//! | `GET /api/auth/authorize` | validate client + redirect target, 302 to the provider |
//! | `GET /api/auth/callback` | split the combined state, 302 back to the right client |
//! | `POST /api/auth/token` | exchange the code upstream, mint app tokens |
//! | `GET /api/auth/session` | verify the web session cookie |
//! | `POST /api/auth/refresh` | re-mint tokens from a refresh token |
//! | `POST /api/auth/logout` | clear both cookies |

mod config;
mod cookies;
mod error;
mod extract;
mod routes;
mod state;
mod types;
mod upstream;

pub use config::GatewayConfig;
pub use cookies::{
    parse_cookie_header, CookieEntry, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME,
};
pub use error::GatewayError;
pub use extract::AuthUser;
pub use routes::{auth_routes, auth_routes_from, auth_routes_with};
pub use state::GatewayState;
pub use types::AuthorizationState;
pub use upstream::{GoogleProvider, IdentityProvider, UpstreamTokenResponse};
