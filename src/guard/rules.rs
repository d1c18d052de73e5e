use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::constants::CLIENT_ID_VALUE;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Web,
    Mobile,
}

/// Per-request classification verdict. Transient: inserted into
/// request extensions, never persisted.
#[derive(Debug, Clone)]
pub struct Classification {
    pub allowed: bool,
    pub client_type: Option<ClientType>,
    pub reason: Option<String>,
}

impl Classification {
    fn allow(client_type: Option<ClientType>) -> Self {
        Self {
            allowed: true,
            client_type,
            reason: None,
        }
    }

    fn deny(reason: &str) -> Self {
        Self {
            allowed: false,
            client_type: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Classification inputs lifted off an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub path: String,
    pub origin: Option<String>,
    pub host: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub client_header: Option<String>,
}

/// Ordered classification policy. Pattern lists are data, not control
/// flow: new client signatures are added to the lists, the rule order
/// never changes.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    web_origins: Vec<String>,
    web_hosts: Vec<String>,
    mobile_signatures: Vec<Regex>,
    suspicious_agents: Vec<Regex>,
    client_token: String,
    bypass_prefixes: Vec<String>,
}

/// First-party dashboard origins, production plus local development.
fn default_web_origins() -> Vec<String> {
    vec![
        "https://hr.fieldforce.io".to_string(),
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_mobile_signatures() -> Vec<String> {
    vec![
        "FieldForce-Mobile".to_string(),
        "okhttp".to_string(),
        "Dart/".to_string(),
    ]
}

/// Automation and tooling signatures. `okhttp` appears here too: it is
/// a generic HTTP library as well as the mobile stack, which is why
/// the mobile rule must win over this list.
fn default_suspicious_agents() -> Vec<String> {
    vec![
        "curl".to_string(),
        "wget".to_string(),
        "python-requests".to_string(),
        "python-urllib".to_string(),
        "Go-http-client".to_string(),
        "Java/".to_string(),
        "libwww-perl".to_string(),
        "Scrapy".to_string(),
        "HeadlessChrome".to_string(),
        "okhttp".to_string(),
        "bot".to_string(),
        "spider".to_string(),
        "scraper".to_string(),
    ]
}

fn compile_patterns(patterns: &[String]) -> AuthResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("(?i){}", p))
                .map_err(|e| AuthError::Configuration(format!("Invalid agent pattern '{}': {}", p, e)))
        })
        .collect()
}

fn origin_hosts(origins: &[String]) -> Vec<String> {
    origins
        .iter()
        .filter_map(|origin| {
            let url = Url::parse(origin).ok()?;
            let host = url.host_str()?.to_string();
            Some(match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .collect()
}

impl GuardPolicy {
    pub fn new(
        web_origins: Vec<String>,
        mobile_signatures: Vec<String>,
        suspicious_agents: Vec<String>,
        client_token: String,
    ) -> AuthResult<Self> {
        let web_hosts = origin_hosts(&web_origins);
        Ok(Self {
            web_origins: web_origins
                .into_iter()
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
            web_hosts,
            mobile_signatures: compile_patterns(&mobile_signatures)?,
            suspicious_agents: compile_patterns(&suspicious_agents)?,
            client_token,
            bypass_prefixes: vec!["/health".to_string()],
        })
    }

    /// Default pattern lists with deployment-specific web origins and
    /// app token.
    pub fn with_origins(web_origins: Vec<String>, client_token: String) -> AuthResult<Self> {
        Self::new(
            web_origins,
            default_mobile_signatures(),
            default_suspicious_agents(),
            client_token,
        )
    }

    pub fn with_defaults() -> Self {
        // Default patterns are known-good literals, compiled once.
        static DEFAULT_POLICY: Lazy<GuardPolicy> = Lazy::new(|| {
            GuardPolicy::new(
                default_web_origins(),
                default_mobile_signatures(),
                default_suspicious_agents(),
                CLIENT_ID_VALUE.to_string(),
            )
            .expect("default guard patterns compile")
        });
        DEFAULT_POLICY.clone()
    }

    /// Health/diagnostic paths skip classification and token gating.
    pub fn is_bypass(&self, path: &str) -> bool {
        self.bypass_prefixes.iter().any(|p| path.starts_with(p))
    }

    /// One-pass, terminal classification.
    pub fn classify(&self, meta: &RequestMeta) -> Classification {
        if self.is_bypass(&meta.path) {
            return Classification::allow(None);
        }

        if self.is_first_party_web(meta) {
            return Classification::allow(Some(ClientType::Web));
        }

        // Mobile rule: app signature or the client header itself,
        // provided the header carries the expected app token. This
        // rule precedes the suspicious-agent list so a legitimate
        // mobile client is never blocked for matching a generic
        // library pattern.
        let header_ok = meta.client_header.as_deref() == Some(self.client_token.as_str());
        let looks_mobile = meta.client_header.is_some()
            || self.matches_any(&self.mobile_signatures, meta.user_agent.as_deref());
        if looks_mobile && header_ok {
            return Classification::allow(Some(ClientType::Mobile));
        }

        if self.matches_any(&self.suspicious_agents, meta.user_agent.as_deref()) {
            debug!(
                "Suspicious agent rejected: {:?}",
                meta.user_agent.as_deref().unwrap_or("<none>")
            );
            return Classification::deny("Suspicious agent detected");
        }

        Classification::deny("External access is not permitted")
    }

    fn is_first_party_web(&self, meta: &RequestMeta) -> bool {
        if let Some(origin) = meta.origin.as_deref() {
            let origin = origin.trim_end_matches('/');
            if self.web_origins.iter().any(|o| o == origin) {
                return true;
            }
        }
        if let Some(referer) = meta.referer.as_deref() {
            if self.web_origins.iter().any(|o| referer.starts_with(o.as_str())) {
                return true;
            }
        }
        if let Some(host) = meta.host.as_deref() {
            if self.web_hosts.iter().any(|h| h == host) {
                return true;
            }
        }
        false
    }

    fn matches_any(&self, patterns: &[Regex], value: Option<&str>) -> bool {
        match value {
            Some(v) => patterns.iter().any(|p| p.is_match(v)),
            None => false,
        }
    }
}
