use std::sync::Arc;

use super::config::GatewayConfig;
use super::upstream::IdentityProvider;
use crate::token::TokenCodec;

/// Shared state for the gateway route handlers.
pub struct GatewayState<P> {
    pub(super) provider: Arc<P>,
    pub(super) codec: Arc<TokenCodec>,
    pub(super) config: Arc<GatewayConfig>,
}

// Manual Clone: avoid derive adding a `P: Clone` bound.
impl<P> Clone for GatewayState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            codec: self.codec.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: IdentityProvider> GatewayState<P> {
    /// Build the shared state directly, for apps that mount their own
    /// routes (e.g. with [`super::AuthUser`]) on the same state.
    #[must_use]
    pub fn new(config: GatewayConfig, provider: P) -> Self {
        let codec = TokenCodec::new(&config.token_secret);
        Self {
            provider: Arc::new(provider),
            codec: Arc::new(codec),
            config: Arc::new(config),
        }
    }
}
