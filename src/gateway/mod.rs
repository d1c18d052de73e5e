//! HTTP gateway used by every network-calling component on the client
//! side. Bounds each call with a timeout, retries transport failures
//! with linear backoff, and translates every outcome into the closed
//! error taxonomy.

use log::{debug, warn};
use reqwest::{Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::constants::{
    CLIENT_ID_HEADER, CLIENT_ID_VALUE, CLIENT_USER_AGENT, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS,
};
use crate::error::{AuthError, AuthResult, ErrorBody};
use crate::models::claims::EmploymentStatus;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Total connection attempts for transport-class failures.
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: &str) -> AuthResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AuthError::Configuration(format!("Invalid server URL: {}", e)))?;
        Ok(Self {
            base_url: parsed.to_string().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        })
    }
}

#[derive(Debug)]
pub struct RequestGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl RequestGateway {
    pub fn new(config: GatewayConfig) -> AuthResult<Self> {
        let mut headers = header::HeaderMap::new();
        // Fixed client identification so the boundary guard can tell
        // first-party app traffic from arbitrary HTTP clients.
        headers.insert(
            CLIENT_ID_HEADER,
            header::HeaderValue::from_static(CLIENT_ID_VALUE),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(CLIENT_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Issues a request, retrying transport-class failures only.
    /// A received HTTP error status is terminal and translated
    /// immediately.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        bearer: Option<&str>,
    ) -> AuthResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let mut builder = self.client.request(method.clone(), &url);
            if let Some(ref json) = body {
                builder = builder.json(json);
            }
            if let Some(token) = bearer {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => return Err(translate_error_response(response).await),
                Err(err) => {
                    let translated = classify_transport_error(&err);
                    if attempt >= attempts {
                        warn!(
                            "{} {} failed after {} attempts: {}",
                            method, path, attempt, err
                        );
                        return Err(translated);
                    }
                    let delay = self.config.retry_base_delay * attempt;
                    debug!(
                        "{} {} attempt {}/{} failed ({}), retrying in {:?}",
                        method, path, attempt, attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AuthResult<T> {
        let json = serde_json::to_value(body)?;
        let response = self.request(Method::POST, path, Some(json), None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::Serialization(format!("Failed to parse response: {}", e)))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> AuthResult<T> {
        let response = self.request(Method::GET, path, None, bearer).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::Serialization(format!("Failed to parse response: {}", e)))
    }
}

fn classify_transport_error(err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout(err.to_string())
    } else {
        AuthError::Network(err.to_string())
    }
}

/// Maps a received HTTP error response to the taxonomy, honoring the
/// structured `{error, message, employmentStatus?, retryAfter?}` shape
/// when the server provides it.
async fn translate_error_response(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorBody>(&text).ok();

    let message = parsed
        .as_ref()
        .map(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    match status.as_u16() {
        400 => AuthError::Validation(message),
        401 => AuthError::AuthenticationFailed(message),
        403 => {
            let employment_status = parsed
                .as_ref()
                .and_then(|b| b.employment_status.as_deref())
                .and_then(parse_employment_status);
            AuthError::AuthorizationDenied {
                message,
                status: employment_status,
            }
        }
        429 => AuthError::RateLimited {
            retry_after: parsed.as_ref().and_then(|b| b.retry_after),
        },
        _ => AuthError::Server(format!("{} ({})", message, status.as_u16())),
    }
}

fn parse_employment_status(raw: &str) -> Option<EmploymentStatus> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}
