use std::future::Future;

use serde::Deserialize;
use url::Url;

use super::config::GatewayConfig;
use super::error::GatewayError;

/// Raw body of the upstream provider's token endpoint response.
///
/// Google returns either the token fields or an `error`/`error_description`
/// pair; both arrive with a parseable JSON body, so the transport layer only
/// fails on network problems.
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct UpstreamTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// The upstream identity provider the gateway exchanges codes with.
///
/// Implemented by [`GoogleProvider`] in production and by in-process mocks
/// in tests.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Exchange an authorization code for provider tokens.
    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<UpstreamTokenResponse, GatewayError>> + Send;
}

/// Google OAuth2 token-endpoint client.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    token_url: Url,
    redirect_uri: Url,
    http: reqwest::Client,
}

impl GoogleProvider {
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

impl IdentityProvider for GoogleProvider {
    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<UpstreamTokenResponse, GatewayError>> + Send {
        let request = self.http.post(self.token_url.clone()).form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ]);

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Internal(format!("upstream request failed: {e}")))?;

            // Error responses carry a JSON body too; surface those as
            // upstream errors rather than transport failures.
            response
                .json::<UpstreamTokenResponse>()
                .await
                .map_err(|e| GatewayError::Internal(format!("upstream response unreadable: {e}")))
        }
    }
}
