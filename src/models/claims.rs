use serde::{Deserialize, Serialize};
use std::fmt;

/// Employment status of an account. The single source of truth for
/// whether a status may sign in is [`EmploymentStatus::can_login`];
/// token issuance and boundary gating both go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Suspended,
    Resigned,
    Terminated,
}

impl EmploymentStatus {
    pub fn can_login(self) -> bool {
        matches!(self, Self::Active | Self::OnLeave)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::OnLeave => "ON_LEAVE",
            Self::Suspended => "SUSPENDED",
            Self::Resigned => "RESIGNED",
            Self::Terminated => "TERMINATED",
        }
    }

    /// User-facing denial text. Statuses that forbid login each get
    /// distinct wording; this is the only place a specific reason is
    /// exposed to the caller.
    pub fn denial_message(self) -> &'static str {
        match self {
            Self::Suspended => "Your account is suspended. Contact HR for assistance.",
            Self::Resigned => "This account belongs to a resigned employee and can no longer sign in.",
            Self::Terminated => "This account has been terminated and can no longer sign in.",
            Self::Active | Self::OnLeave => "Access denied.",
        }
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token claims as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Human-readable account id (employee code).
    pub sub: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "employmentStatus")]
    pub employment_status: EmploymentStatus,
    #[serde(rename = "canLogin")]
    pub can_login: bool,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}
