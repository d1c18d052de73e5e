//! Signature-less token inspection for the client side, which holds
//! no verification key. Only the server's validate path establishes
//! authenticity; everything here is structural.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use log::debug;

/// Decodes the claims segment of a compact token without verifying
/// the signature. Returns `None` for anything that is not three
/// dot-separated base64url segments carrying a JSON object.
pub fn decode_payload(token: &str) -> Option<serde_json::Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let decoded = match URL_SAFE_NO_PAD.decode(parts[1]) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Token payload is not valid base64url: {}", e);
            return None;
        }
    };

    match serde_json::from_slice::<serde_json::Value>(&decoded) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            debug!("Token payload is not valid JSON: {}", e);
            None
        }
    }
}

/// Structural well-formedness check used for session derivation.
pub fn is_well_formed(token: &str) -> bool {
    decode_payload(token).is_some()
}

/// The `exp` claim in seconds since the Unix epoch, if present.
pub fn decode_exp(token: &str) -> Option<i64> {
    decode_payload(token)?.get("exp")?.as_i64()
}

/// Seconds until the token expires. `None` if the token is malformed
/// or already expired.
pub fn seconds_until_expiry(token: &str) -> Option<i64> {
    let remaining = decode_exp(token)? - Utc::now().timestamp();
    if remaining <= 0 { None } else { Some(remaining) }
}

/// Whether the token lapses within the threshold. Malformed and
/// already-expired tokens count as expiring.
pub fn is_expiring_within(token: &str, threshold_secs: i64) -> bool {
    match seconds_until_expiry(token) {
        Some(secs) => secs <= threshold_secs,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Header {"alg":"HS256","typ":"JWT"}, payload {"exp":1234567890,"sub":"test"}
    const SAMPLE: &str =
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJleHAiOjEyMzQ1Njc4OTAsInN1YiI6InRlc3QifQ.sig";

    #[test]
    fn decodes_exp_from_payload() {
        assert_eq!(decode_exp(SAMPLE), Some(1_234_567_890));
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("only-one-segment"));
        assert!(!is_well_formed("two.segments"));
        assert!(!is_well_formed("a.b.c.d"));
        assert!(decode_exp("two.segments").is_none());
    }

    #[test]
    fn rejects_non_json_payload() {
        assert!(!is_well_formed("head.!!notbase64!!.sig"));
        // "aGVsbG8" is base64url for "hello", which is not JSON.
        assert!(!is_well_formed("head.aGVsbG8.sig"));
    }

    #[test]
    fn sample_token_is_well_formed() {
        assert!(is_well_formed(SAMPLE));
    }

    #[test]
    fn expired_token_counts_as_expiring() {
        // exp in SAMPLE is in 2009.
        assert!(seconds_until_expiry(SAMPLE).is_none());
        assert!(is_expiring_within(SAMPLE, 60));
        assert!(is_expiring_within("garbage", 60));
    }
}
