//! Signed-token issuing and validation. Pure and stateless: every
//! operation is a function of its inputs plus the signing key.

pub mod introspection;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::debug;
use std::fmt;

use crate::constants::{DEFAULT_TOKEN_TTL_SECS, TOKEN_AUDIENCE, TOKEN_ISSUER};
use crate::error::{AuthError, AuthResult};
use crate::models::claims::{Claims, EmploymentStatus};

/// Opaque validation failure. Tampered signatures and wrong
/// issuer/audience are deliberately indistinguishable to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid token")
    }
}

impl std::error::Error for InvalidToken {}

impl From<InvalidToken> for AuthError {
    fn from(_: InvalidToken) -> Self {
        Self::AuthenticationFailed("Invalid or expired token".to_string())
    }
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn with_default_ttl(secret: &str) -> Self {
        Self::new(secret, DEFAULT_TOKEN_TTL_SECS)
    }

    /// Issues a signed token for the given identity. `can_login` is
    /// always derived from the status here; callers cannot supply it.
    pub fn issue(
        &self,
        subject: &str,
        account_id: &str,
        status: EmploymentStatus,
    ) -> AuthResult<String> {
        let iat = Utc::now();
        let exp = iat + Duration::seconds(self.ttl_secs);

        let claims = Claims {
            sub: subject.to_string(),
            account_id: account_id.to_string(),
            employment_status: status,
            can_login: status.can_login(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verifies signature, issuer, audience and expiry. Never panics;
    /// every failure collapses into [`InvalidToken`].
    pub fn validate(&self, token: &str) -> Result<Claims, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => {
                debug!("Token validation failed: {}", err);
                Err(InvalidToken)
            }
        }
    }

    /// Re-issues a token with a fresh expiry window, preserving the
    /// identity claims (sliding expiration). The only operation that
    /// accepts an expired token: expiry validation is disabled, but
    /// structure, signature, issuer and audience are still enforced,
    /// and identity claims must be present.
    pub fn refresh(&self, old_token: &str) -> Result<String, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.validate_exp = false;

        let claims = decode::<Claims>(old_token, &self.decoding_key, &validation)
            .map_err(|err| {
                debug!("Refresh rejected malformed token: {}", err);
                InvalidToken
            })?
            .claims;

        if claims.sub.trim().is_empty() || claims.account_id.trim().is_empty() {
            debug!("Refresh rejected token with incomplete identity claims");
            return Err(InvalidToken);
        }

        self.issue(&claims.sub, &claims.account_id, claims.employment_status)
            .map_err(|_| InvalidToken)
    }
}

/// Parses a `Bearer <token>` authorization value. Strict: any other
/// scheme, surrounding whitespace, or embedded whitespace is treated
/// as malformed.
pub fn extract_from_header(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "test-signing-secret";

    fn service() -> TokenService {
        TokenService::new(SECRET, 900)
    }

    fn raw_claims(sub: &str, account_id: &str, iss: &str, aud: &str, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: sub.to_string(),
            account_id: account_id.to_string(),
            employment_status: EmploymentStatus::Active,
            can_login: true,
            iat: now,
            exp: now + exp_offset,
            iss: iss.to_string(),
            aud: aud.to_string(),
        }
    }

    fn encode_raw(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issue_validate_round_trip() {
        let svc = service();
        let token = svc
            .issue("EMP-1042", "acc-7", EmploymentStatus::OnLeave)
            .unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.sub, "EMP-1042");
        assert_eq!(claims.account_id, "acc-7");
        assert_eq!(claims.employment_status, EmploymentStatus::OnLeave);
        assert!(claims.can_login);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn issue_derives_can_login_from_status() {
        let svc = service();
        let token = svc
            .issue("EMP-9", "acc-9", EmploymentStatus::Suspended)
            .unwrap();
        let claims = svc.validate(&token).unwrap();
        assert!(!claims.can_login);
    }

    #[test]
    fn validate_rejects_garbage_without_panicking() {
        let svc = service();
        assert_eq!(svc.validate(""), Err(InvalidToken));
        assert_eq!(svc.validate("one.two"), Err(InvalidToken));
        assert_eq!(svc.validate("not a token at all"), Err(InvalidToken));
    }

    #[test]
    fn validate_rejects_foreign_key() {
        let other = TokenService::new("a-different-secret", 900);
        let token = other
            .issue("EMP-1", "acc-1", EmploymentStatus::Active)
            .unwrap();
        assert_eq!(service().validate(&token), Err(InvalidToken));
    }

    #[test]
    fn validate_rejects_wrong_issuer_and_audience() {
        let svc = service();
        let bad_iss = encode_raw(
            &raw_claims("EMP-1", "acc-1", "someone-else", TOKEN_AUDIENCE, 900),
            SECRET,
        );
        let bad_aud = encode_raw(
            &raw_claims("EMP-1", "acc-1", TOKEN_ISSUER, "other-api", 900),
            SECRET,
        );
        assert_eq!(svc.validate(&bad_iss), Err(InvalidToken));
        assert_eq!(svc.validate(&bad_aud), Err(InvalidToken));
    }

    #[test]
    fn validate_rejects_expired_token() {
        let svc = service();
        let expired = TokenService::new(SECRET, -120)
            .issue("EMP-1", "acc-1", EmploymentStatus::Active)
            .unwrap();
        assert_eq!(svc.validate(&expired), Err(InvalidToken));
    }

    #[test]
    fn refresh_accepts_expired_token_and_reissues() {
        let svc = service();
        let expired = TokenService::new(SECRET, -120)
            .issue("EMP-1042", "acc-7", EmploymentStatus::Active)
            .unwrap();

        let refreshed = svc.refresh(&expired).unwrap();
        let claims = svc.validate(&refreshed).unwrap();
        assert_eq!(claims.sub, "EMP-1042");
        assert_eq!(claims.account_id, "acc-7");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn refresh_rejects_incomplete_identity() {
        let svc = service();
        let no_account = encode_raw(
            &raw_claims("EMP-1", "", TOKEN_ISSUER, TOKEN_AUDIENCE, 900),
            SECRET,
        );
        let no_subject = encode_raw(
            &raw_claims("", "acc-1", TOKEN_ISSUER, TOKEN_AUDIENCE, 900),
            SECRET,
        );
        assert_eq!(svc.refresh(&no_account), Err(InvalidToken));
        assert_eq!(svc.refresh(&no_subject), Err(InvalidToken));
    }

    #[test]
    fn refresh_rejects_structurally_invalid_tokens() {
        let svc = service();
        assert_eq!(svc.refresh(""), Err(InvalidToken));
        assert_eq!(svc.refresh("a.b"), Err(InvalidToken));

        let foreign = TokenService::new("a-different-secret", -120)
            .issue("EMP-1", "acc-1", EmploymentStatus::Active)
            .unwrap();
        assert_eq!(svc.refresh(&foreign), Err(InvalidToken));
    }

    #[test]
    fn header_extraction_is_strict() {
        assert_eq!(extract_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_from_header("Basic xyz"), None);
        assert_eq!(extract_from_header(""), None);
        assert_eq!(extract_from_header("Bearer"), None);
        assert_eq!(extract_from_header("Bearer "), None);
        // Whitespace leniency is not granted anywhere.
        assert_eq!(extract_from_header("Bearer  abc.def.ghi"), None);
        assert_eq!(extract_from_header("Bearer abc.def.ghi "), None);
        assert_eq!(extract_from_header("bearer abc.def.ghi"), None);
    }
}
