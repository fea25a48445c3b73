use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::TokenError;

/// Errors surfaced by the authorization gateway endpoints.
///
/// Every variant maps to a structured JSON body with an HTTP status: 400 for
/// caller-input and state problems, 401 for authentication failures, 500 for
/// anything internal.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The declared internal client identifier is not recognized.
    #[error("invalid client")]
    InvalidClient,

    /// `redirect_uri` matches neither the native scheme nor the web origin.
    #[error("invalid redirect_uri")]
    InvalidRedirect,

    /// The `state` parameter is missing or not in `platform|state` form.
    #[error("invalid state")]
    InvalidState,

    /// The token exchange was called without an authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// The upstream provider rejected the exchange.
    #[error("upstream error: {code}")]
    Upstream {
        code: String,
        description: Option<String>,
    },

    /// The upstream provider's response omitted required fields.
    #[error("incomplete upstream response")]
    IncompleteUpstreamResponse,

    /// Token signing or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// No valid credential accompanied the request.
    #[error("not authenticated")]
    Unauthenticated,

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient
            | Self::InvalidRedirect
            | Self::InvalidState
            | Self::MissingCode
            | Self::Upstream { .. }
            | Self::IncompleteUpstreamResponse => StatusCode::BAD_REQUEST,
            Self::Token(TokenError::Expired | TokenError::Invalid(_)) | Self::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::Token(TokenError::Signing(_)) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, error_description) = match self {
            Self::InvalidClient => ("invalid_client", None),
            Self::InvalidRedirect => ("invalid_redirect", None),
            Self::InvalidState => ("invalid_state", None),
            Self::MissingCode => ("missing_code", None),
            Self::Upstream { code, description } => {
                return ErrorBody {
                    error: code.clone(),
                    error_description: description.clone(),
                }
            }
            Self::IncompleteUpstreamResponse => ("incomplete_upstream_response", None),
            Self::Token(TokenError::Expired) => ("expired_token", None),
            Self::Token(TokenError::Invalid(_)) => ("invalid_token", None),
            Self::Unauthenticated => ("unauthenticated", Some("Not authenticated".to_owned())),
            Self::Token(TokenError::Signing(_)) | Self::Config(_) | Self::Internal(_) => {
                ("server_error", None)
            }
        };
        ErrorBody {
            error: error.to_owned(),
            error_description,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "gateway internal error");
        }
        (status, Json(self.body())).into_response()
    }
}
