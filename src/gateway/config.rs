use url::Url;

use super::error::GatewayError;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Authorization gateway configuration.
///
/// Required fields are constructor parameters; optional fields use defaults
/// overridable with `with_*` methods. Use [`from_env()`](Self::from_env) for
/// convention-based setup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) base_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) app_scheme: String,
    pub(crate) token_secret: String,
    pub(crate) scopes: Vec<String>,
    pub(crate) secure_cookies: bool,
}

impl GatewayConfig {
    /// Create a configuration from the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a required value is empty or the
    /// upstream redirect URI cannot be derived from `base_url`.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: Url,
        app_scheme: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client_id = client_id.into();
        let token_secret = token_secret.into();
        let app_scheme = app_scheme.into();
        if client_id.is_empty() {
            return Err(GatewayError::Config("client id must not be empty".into()));
        }
        if token_secret.is_empty() {
            return Err(GatewayError::Config(
                "token signing secret must not be empty".into(),
            ));
        }
        if app_scheme.is_empty() {
            return Err(GatewayError::Config("app scheme must not be empty".into()));
        }

        let redirect_uri = base_url
            .join("/api/auth/callback")
            .map_err(|e| GatewayError::Config(format!("base url: {e}")))?;

        Ok(Self {
            client_id,
            client_secret: client_secret.into(),
            auth_url: DEFAULT_AUTH_URL.parse().expect("valid default URL"),
            token_url: DEFAULT_TOKEN_URL.parse().expect("valid default URL"),
            base_url,
            redirect_uri,
            app_scheme,
            token_secret,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
            secure_cookies: true,
        })
    }

    /// Create a configuration from environment variables.
    ///
    /// # Required env vars
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: upstream OAuth2 client
    /// - `AUTH_BASE_URL`: public origin the gateway is served from
    /// - `AUTH_APP_SCHEME`: the native app's deep-link scheme
    /// - `AUTH_TOKEN_SECRET`: HS256 signing secret for app tokens
    ///
    /// # Optional env vars
    /// - `GOOGLE_AUTH_URL` / `GOOGLE_TOKEN_URL`: upstream endpoint overrides
    /// - `AUTH_SCOPES`: comma-separated default scopes
    /// - `AUTH_INSECURE_COOKIES`: set to `1` or `true` to drop the `Secure`
    ///   cookie flag for local development
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] naming the first missing or invalid
    /// variable.
    pub fn from_env() -> Result<Self, GatewayError> {
        let client_id = required_env("GOOGLE_CLIENT_ID")?;
        let client_secret = required_env("GOOGLE_CLIENT_SECRET")?;
        let base_url: Url = required_env("AUTH_BASE_URL")?
            .parse()
            .map_err(|e| GatewayError::Config(format!("AUTH_BASE_URL: {e}")))?;
        let app_scheme = required_env("AUTH_APP_SCHEME")?;
        let token_secret = required_env("AUTH_TOKEN_SECRET")?;

        let mut config = Self::new(client_id, client_secret, base_url, app_scheme, token_secret)?;

        if let Ok(url) = std::env::var("GOOGLE_AUTH_URL") {
            let url: Url = url
                .parse()
                .map_err(|e| GatewayError::Config(format!("GOOGLE_AUTH_URL: {e}")))?;
            config = config.with_auth_url(url);
        }
        if let Ok(url) = std::env::var("GOOGLE_TOKEN_URL") {
            let url: Url = url
                .parse()
                .map_err(|e| GatewayError::Config(format!("GOOGLE_TOKEN_URL: {e}")))?;
            config = config.with_token_url(url);
        }
        if let Ok(scopes) = std::env::var("AUTH_SCOPES") {
            config = config.with_scopes(scopes.split(',').map(|s| s.trim().to_owned()).collect());
        }
        if matches!(
            std::env::var("AUTH_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true")
        ) {
            config = config.with_secure_cookies(false);
        }

        Ok(config)
    }

    /// Override the upstream authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the upstream token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the default scopes requested when the caller sends none.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Drop the `Secure` flag from issued cookies (local development only).
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// The public origin the gateway is served from.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The native app's deep-link scheme.
    #[must_use]
    pub fn app_scheme(&self) -> &str {
        &self.app_scheme
    }
}

fn required_env(name: &'static str) -> Result<String, GatewayError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(GatewayError::Config(format!("{name} is required"))),
    }
}
