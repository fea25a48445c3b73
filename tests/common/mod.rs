//! Shared fixtures: a mock identity provider and a gateway served on an
//! ephemeral local port.
#![allow(dead_code)] // each test binary uses a different subset

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rollbook_auth::gateway::{
    auth_routes_with, GatewayConfig, GatewayError, IdentityProvider, UpstreamTokenResponse,
};
use rollbook_auth::types::UserClaims;
use rollbook_auth::TokenCodec;

/// Signing secret shared by the served gateway and test assertions.
pub const SECRET: &str = "integration-test-secret";

pub fn test_config(base_url: &str) -> GatewayConfig {
    GatewayConfig::new(
        "upstream-client-id",
        "upstream-client-secret",
        base_url.parse().unwrap(),
        "rollbook://",
        SECRET,
    )
    .unwrap()
    // Tests run over plain http, so cookies must not carry `Secure`.
    .with_secure_cookies(false)
}

/// Identity provider returning a canned response and counting exchanges.
#[derive(Clone, Default)]
pub struct MockProvider {
    pub response: UpstreamTokenResponse,
    pub exchanges: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn succeeding(sub: &str) -> Self {
        Self {
            response: upstream_success(sub),
            exchanges: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl IdentityProvider for MockProvider {
    fn exchange_code(
        &self,
        _code: &str,
    ) -> impl Future<Output = Result<UpstreamTokenResponse, GatewayError>> + Send {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        async move { Ok(response) }
    }
}

/// An HS256 JWT shaped like an upstream identity token. The gateway decodes
/// it without verifying, so the signing secret here is arbitrary.
pub fn fake_id_token(sub: &str) -> String {
    let user = UserClaims::new(sub)
        .with_name("Test User")
        .with_email("test@example.com");
    TokenCodec::new("upstream-secret")
        .sign_access(&user, 3600)
        .unwrap()
}

pub fn upstream_success(sub: &str) -> UpstreamTokenResponse {
    let mut response = UpstreamTokenResponse::default();
    response.id_token = Some(fake_id_token(sub));
    response.access_token = Some("google-access".into());
    response.refresh_token = Some("google-refresh".into());
    response
}

pub struct TestGateway {
    pub base_url: String,
    pub refresh_calls: Arc<AtomicUsize>,
    pub server: JoinHandle<()>,
}

/// Serve the gateway (plus any extra routes) on 127.0.0.1, counting hits to
/// the refresh endpoint.
pub async fn spawn_gateway(provider: MockProvider, extra: Option<Router>) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let counter = refresh_calls.clone();

    let mut app = auth_routes_with(test_config(&base_url), provider);
    if let Some(extra) = extra {
        app = app.merge(extra);
    }
    let app = app.layer(axum::middleware::from_fn(
        move |req: axum::extract::Request, next: axum::middleware::Next| {
            let counter = counter.clone();
            async move {
                if req.uri().path() == "/api/auth/refresh" {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                next.run(req).await
            }
        },
    ));

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestGateway {
        base_url,
        refresh_calls,
        server,
    }
}

/// Client that does not follow redirects, for asserting on 302 responses.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
