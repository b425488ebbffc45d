use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use core_config::{ConfigError, FromEnv, env_optional, env_parse_or};
use serde::Deserialize;
use std::time::Duration;
use tower::ServiceExt;
use tracing::instrument;

use super::credentials::Credentials;
use super::endpoint::TOKEN_PATH;
use super::error::INVALID_GRANT_MESSAGE;
use crate::error::{UserError, UserResult};
use crate::models::TokenResponse;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Submits credentials to a token endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> UserResult<TokenResponse>;
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: Option<String>,
    error_description: Option<String>,
}

/// Turn a token endpoint reply into a token payload or an `Unauthorized` error
/// carrying the upstream message.
pub fn interpret_token_response(status: StatusCode, body: &[u8]) -> UserResult<TokenResponse> {
    if status == StatusCode::OK {
        return serde_json::from_slice(body).map_err(|e| UserError::Parsing(e.to_string()));
    }

    let upstream: UpstreamError =
        serde_json::from_slice(body).map_err(|e| UserError::Parsing(e.to_string()))?;

    let message = upstream
        .message
        .or(upstream.error_description)
        .unwrap_or_else(|| "Unauthenticated.".to_string());

    tracing::info!(%status, "Token endpoint rejected credentials");
    if message == INVALID_GRANT_MESSAGE {
        Err(UserError::incorrect_credentials())
    } else {
        Err(UserError::Unauthorized(message))
    }
}

/// Form body for the in-process request, which bypasses reqwest
fn encode_form(credentials: &Credentials) -> String {
    credentials
        .to_form()
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Calls the token endpoint router mounted in this process
#[derive(Clone)]
pub struct InProcessTokenExchange {
    router: Router,
}

impl InProcessTokenExchange {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl TokenExchange for InProcessTokenExchange {
    #[instrument(skip_all, fields(grant_type = %credentials.grant_type))]
    async fn exchange(&self, credentials: &Credentials) -> UserResult<TokenResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(TOKEN_PATH)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(header::ACCEPT, "application/json")
            .body(Body::from(encode_form(credentials)))
            .map_err(|e| UserError::Internal(format!("Failed to build token request: {e}")))?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| UserError::Internal(format!("Token endpoint unavailable: {e}")))?;

        let status = response.status();
        let body = to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| UserError::Internal(format!("Failed to read token response: {e}")))?;

        interpret_token_response(status, &body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpointConfig {
    /// External token URL; the in-process endpoint is used when unset
    pub url: Option<String>,
    pub timeout: Duration,
}

impl FromEnv for TokenEndpointConfig {
    /// - TOKEN_ENDPOINT_URL: optional
    /// - TOKEN_ENDPOINT_TIMEOUT_SECS: defaults to 10
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_optional("TOKEN_ENDPOINT_URL"),
            timeout: Duration::from_secs(env_parse_or("TOKEN_ENDPOINT_TIMEOUT_SECS", 10u64)?),
        })
    }
}

/// Calls a token endpoint over HTTP
#[derive(Clone)]
pub struct HttpTokenExchange {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenExchange {
    pub fn new(url: impl Into<String>, timeout: Duration) -> UserResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UserError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    #[instrument(skip_all, fields(grant_type = %credentials.grant_type, url = %self.url))]
    async fn exchange(&self, credentials: &Credentials) -> UserResult<TokenResponse> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&credentials.to_form())
            .send()
            .await
            .map_err(|e| UserError::Internal(format!("Token endpoint request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UserError::Internal(format!("Failed to read token response: {e}")))?;

        interpret_token_response(status, &body)
    }
}
