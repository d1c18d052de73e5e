use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::constants::{
    CLIENT_ID_VALUE, DEFAULT_REFRESH_LEAD_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_TOKEN_TTL_SECS,
};
use crate::error::{AuthError, AuthResult};
use crate::gateway::GatewayConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub gateway: GatewaySettings,
    pub guard: GuardConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_secs: i64,
    pub refresh_lead_secs: i64,
}

/// Client-side gateway settings (mobile shell and tooling).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardConfig {
    /// First-party dashboard origins; empty means the built-in list.
    pub web_origins: Vec<String>,
    pub client_token: String,
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> AuthResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| AuthError::Configuration(format!("{} must be a valid number", name))),
        Err(_) => Ok(default),
    }
}

fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl AppSettings {
    pub fn from_env() -> AuthResult<Self> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed_var("SERVER_PORT", 8080u16)?;
        let cors_origins = list_var("CORS_ORIGINS").unwrap_or_else(|| vec!["*".to_string()]);

        let token_secret = env::var("AUTH_TOKEN_SECRET")
            .map_err(|_| AuthError::Configuration("AUTH_TOKEN_SECRET must be set".to_string()))?;
        let token_ttl_secs = parsed_var("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        let refresh_lead_secs = parsed_var("REFRESH_LEAD_SECS", DEFAULT_REFRESH_LEAD_SECS)?;

        let base_url =
            env::var("SERVER_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let timeout_secs = parsed_var("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let retry_attempts = parsed_var("RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS)?;
        let retry_base_delay_ms = parsed_var("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS)?;

        let web_origins = list_var("GUARD_WEB_ORIGINS").unwrap_or_default();
        let client_token =
            env::var("GUARD_CLIENT_TOKEN").unwrap_or_else(|_| CLIENT_ID_VALUE.to_string());

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                cors_origins,
            },
            auth: AuthConfig {
                token_secret,
                token_ttl_secs,
                refresh_lead_secs,
            },
            gateway: GatewaySettings {
                base_url,
                timeout_secs,
                retry_attempts,
                retry_base_delay_ms,
            },
            guard: GuardConfig {
                web_origins,
                client_token,
            },
        })
    }
}

impl GatewaySettings {
    pub fn to_gateway_config(&self) -> AuthResult<GatewayConfig> {
        let mut config = GatewayConfig::new(&self.base_url)?;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.retry_attempts = self.retry_attempts;
        config.retry_base_delay = Duration::from_millis(self.retry_base_delay_ms);
        Ok(config)
    }
}
