//! Fixed protocol constants shared by both halves of the auth core.

/// Header carrying the fixed app token that identifies first-party
/// mobile builds to the boundary guard.
pub const CLIENT_ID_HEADER: &str = "x-fieldforce-client";

/// App token value shipped in mobile builds. Rotated with releases.
pub const CLIENT_ID_VALUE: &str = "fieldforce-mobile-v1";

/// User-Agent sent by the request gateway.
pub const CLIENT_USER_AGENT: &str = "FieldForce-Mobile/0.4";

pub const TOKEN_ISSUER: &str = "fieldforce";
pub const TOKEN_AUDIENCE: &str = "fieldforce-api";

// Credential store entry keys
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_PROFILE_KEY: &str = "user_profile";

/// Service name under which keyring entries are registered.
pub const KEYRING_SERVICE: &str = "fieldforce";

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_LEAD_SECS: i64 = 60;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
