use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claims::EmploymentStatus;
use crate::token::introspection;

/// Cached employee profile as returned by the login and user endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub employment_status: EmploymentStatus,
    #[serde(default)]
    pub role: Option<String>,
}

/// Client-side view of the current session, derived from the
/// credential store. Never constructed from network responses
/// directly.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub user: Option<UserProfile>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated iff both the access token and the user are
    /// present and the token is structurally well-formed. Signature
    /// verification is the server's job; the client holds no key.
    pub fn is_authenticated(&self) -> bool {
        match (&self.access_token, &self.user) {
            (Some(token), Some(_)) => introspection::is_well_formed(token),
            _ => false,
        }
    }
}

// Wire shapes for the /auth surface.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDataResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            account_id: "emp-1042".to_string(),
            name: "A. Farmer".to_string(),
            email: None,
            employment_status: EmploymentStatus::Active,
            role: Some("field_officer".to_string()),
        }
    }

    #[test]
    fn anonymous_session_is_unauthenticated() {
        assert!(!Session::anonymous().is_authenticated());
    }

    #[test]
    fn session_requires_both_token_and_user() {
        let session = Session {
            access_token: None,
            user: Some(profile()),
            ..Session::anonymous()
        };
        assert!(!session.is_authenticated());
    }

    #[test]
    fn malformed_token_is_unauthenticated() {
        let session = Session {
            access_token: Some("not-a-token".to_string()),
            user: Some(profile()),
            ..Session::anonymous()
        };
        assert!(!session.is_authenticated());
    }

    #[test]
    fn login_response_tolerates_missing_refresh_token() {
        let raw = r#"{"token":"a.b.c","user":{"accountId":"emp-1","name":"N","employmentStatus":"ACTIVE"}}"#;
        let parsed: AuthDataResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.refresh_token.is_none());
        assert_eq!(parsed.user.account_id, "emp-1");
    }
}
