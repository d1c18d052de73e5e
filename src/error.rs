use actix_web::{HttpResponse, error::ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::claims::EmploymentStatus;

/// Closed error taxonomy for the auth core. Transport-class variants
/// (`Network`, `Timeout`) are the only ones the gateway retries.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {message}")]
    AuthorizationDenied {
        message: String,
        status: Option<EmploymentStatus>,
    },

    #[error("Rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Whether the gateway may retry the failed call. HTTP error
    /// statuses are terminal; only transport failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    pub fn denied_for_status(status: EmploymentStatus) -> Self {
        Self::AuthorizationDenied {
            message: status.denial_message().to_string(),
            status: Some(status),
        }
    }

    /// Stable, non-technical message for the UI layer. Employment
    /// status denials are the only case where the specific reason is
    /// shown.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Timeout(_) => "The server took too long to respond. Try again.".to_string(),
            Self::AuthenticationFailed(_) => "Sign-in failed. Check your credentials.".to_string(),
            Self::AuthorizationDenied { message, .. } => message.clone(),
            Self::RateLimited { .. } => "Too many attempts. Wait a moment and retry.".to_string(),
            Self::Server(_) => "The server hit a problem. Try again later.".to_string(),
            Self::Validation(msg) => msg.clone(),
            _ => "Something went wrong. Try again.".to_string(),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::AuthorizationDenied { .. } => "authorization_error",
            Self::RateLimited { .. } => "rate_limit_error",
            Self::Server(_) => "server_error",
            Self::Validation(_) => "validation_error",
            Self::Storage(_) => "storage_error",
            Self::Configuration(_) => "configuration_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Wire shape for error responses, shared with the gateway's response
/// translation on the client side.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(rename = "employmentStatus", skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (employment_status, retry_after) = match self {
            Self::AuthorizationDenied { status, .. } => {
                (status.map(|s| s.as_str().to_string()), None)
            }
            Self::RateLimited { retry_after } => (None, *retry_after),
            _ => (None, None),
        };

        let body = ErrorBody {
            error: self.error_type().to_string(),
            message: self.user_message(),
            employment_status,
            retry_after,
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", error))
    }
}
