//! The single choke point for outbound HTTP calls.
//!
//! Every request goes to one fixed base URL and, unless it opts out, carries
//! the bearer token currently held by the credential store. Failures are
//! reported as-is; classifying them is left to callers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::credential_store::CredentialStore;

pub const LOGIN_PATH: &str = "/api/login";
pub const CURRENT_USER_PATH: &str = "/api/me";
pub const GENERATE_FULL_ARTICLE_PATH: &str = "/api/generate-full-article";
pub const GENERATE_ARTICLE_PATH: &str = "/api/generate-article";
pub const GENERATE_SEO_PATH: &str = "/api/generate-seo";
pub const GENERATE_HTML_PATH: &str = "/api/generate-html";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway_invalid_path")]
    InvalidPath,
    #[error("request_encode_failed:{message}")]
    Encode { message: String },
    #[error("network_error:{message}")]
    Network { message: String },
    #[error("http_{status}:{message}")]
    Http { status: u16, message: String },
    #[error("decode_failed_{status}:{message}")]
    Decode { status: u16, message: String },
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::InvalidPath | Self::Encode { .. } | Self::Network { .. } => None,
        }
    }

    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::Http { status: 401 | 403, .. })
    }
}

/// Which credential, if any, a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequirement {
    None,
    AccessToken,
    Explicit(String),
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct RequestGateway {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RequestGateway {
    #[must_use]
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms()),
            http: reqwest::Client::new(),
            store,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    pub async fn get_json<T>(&self, path: &str, auth: &AuthRequirement) -> Result<T, GatewayError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(GatewayError::InvalidPath)?;
        let request = self.http.get(url.as_str());
        self.send(request, path, auth).await
    }

    pub async fn post_json<Req, Res>(
        &self,
        path: &str,
        payload: &Req,
        auth: &AuthRequirement,
    ) -> Result<Res, GatewayError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(GatewayError::InvalidPath)?;
        let body = serde_json::to_vec(payload).map_err(|error| GatewayError::Encode {
            message: error.to_string(),
        })?;
        let request = self
            .http
            .post(url.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request, path, auth).await
    }

    async fn send<T>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
        auth: &AuthRequirement,
    ) -> Result<T, GatewayError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        let mut request = request
            .header("x-request-id", request_id.as_str())
            .timeout(self.timeout);

        let token = self.resolve_bearer_token(auth);
        if let Some(token) = token.as_deref() {
            request = request.bearer_auth(token);
        }

        tracing::debug!(
            path,
            request_id = %request_id,
            authenticated = token.is_some(),
            "sending request"
        );

        let response = request.send().await.map_err(|error| {
            tracing::warn!(path, request_id = %request_id, %error, "request failed");
            GatewayError::Network {
                message: error.to_string(),
            }
        })?;

        decode_json_response(response).await
    }

    /// Blank tokens are treated as absent.
    fn resolve_bearer_token(&self, auth: &AuthRequirement) -> Option<String> {
        let token = match auth {
            AuthRequirement::None => None,
            AuthRequirement::Explicit(token) => Some(token.clone()),
            AuthRequirement::AccessToken => match self.store.load() {
                Ok(token) => token,
                Err(error) => {
                    tracing::warn!(%error, "credential store unreadable, sending unauthenticated");
                    None
                }
            },
        };
        token.filter(|token| !token.trim().is_empty())
    }
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, GatewayError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| GatewayError::Network {
            message: error.to_string(),
        })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| GatewayError::Decode {
        status: status.as_u16(),
        message: format!("failed to decode response: {error}"),
    })
}

#[must_use]
pub fn format_http_error(status: StatusCode, body: &[u8]) -> GatewayError {
    GatewayError::Http {
        status: status.as_u16(),
        message: server_message(status, body),
    }
}

fn server_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
        let message = match parsed.detail {
            Some(serde_json::Value::String(detail)) => Some(detail),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
        .or(parsed.message)
        .or_else(|| parsed.error.and_then(|detail| detail.message));
        if let Some(message) = message.and_then(non_empty_string) {
            return message;
        }
    }

    non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
