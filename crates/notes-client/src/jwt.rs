//! Structural JWT decoding.
//!
//! Only the payload segment is read. The signature is NOT verified: the
//! result is advisory (is this token worth sending?) and the backend
//! re-validates every token it receives.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

/// base64url, accepting payloads with or without `=` padding.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid token: missing payload segment")]
    MissingPayload,

    #[error("Invalid token payload encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid token payload JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid token payload: expected a JSON object")]
    NotAnObject,

    #[error("Invalid token payload: missing numeric exp claim")]
    MissingExp,
}

/// Claims extracted from an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    /// Expiry instant, seconds since the Unix epoch
    pub exp: i64,
    /// Every claim, `exp` included
    pub all: Map<String, Value>,
}

impl Claims {
    /// A token is expired once `exp` is strictly before `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }
}

/// Decode the payload of a JWT without checking its signature.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(DecodeError::MissingPayload)?;

    let bytes = BASE64URL.decode(payload)?;
    let all = match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => map,
        _ => return Err(DecodeError::NotAnObject),
    };

    // Fractional exp values are truncated to whole seconds
    let exp = all
        .get("exp")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.floor() as i64)))
        .ok_or(DecodeError::MissingExp)?;

    Ok(Claims { exp, all })
}

/// Build an unsigned token carrying `claims`, for fixtures and tests.
pub fn encode_unsigned(claims: &Value) -> String {
    let header = BASE64URL.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = BASE64URL.encode(claims.to_string());
    format!("{header}.{payload}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_exp() {
        let token = encode_unsigned(&json!({ "exp": 1_700_000_000, "user_id": 7 }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.all.get("user_id"), Some(&json!(7)));
    }

    #[test]
    fn test_decode_real_world_token() {
        // HS256 token as issued by a simplejwt backend; signature is ignored
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
                     eyJ0b2tlbl90eXBlIjoiYWNjZXNzIiwiZXhwIjoxNzE2MjM5MDIyLCJ1c2VyX2lkIjoxfQ.\
                     c2lnbmF0dXJl";
        let claims = decode_claims(token).unwrap();
        assert_eq!(claims.exp, 1_716_239_022);
        assert_eq!(claims.all.get("token_type"), Some(&json!("access")));
    }

    #[test]
    fn test_decode_padded_payload() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":50}"#);
        assert!(padded.ends_with('='));
        let claims = decode_claims(&format!("h.{padded}.s")).unwrap();
        assert_eq!(claims.exp, 50);
    }

    #[test]
    fn test_fractional_exp_truncates() {
        let token = encode_unsigned(&json!({ "exp": 100.9 }));
        assert_eq!(decode_claims(&token).unwrap().exp, 100);
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims { exp: 100, all: Map::new() };
        assert!(!claims.is_expired_at(99));
        assert!(!claims.is_expired_at(100));
        assert!(claims.is_expired_at(101));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(decode_claims("garbage"), Err(DecodeError::MissingPayload)));
        assert!(matches!(decode_claims("a..b"), Err(DecodeError::MissingPayload)));
        assert!(matches!(decode_claims("a.!!!.b"), Err(DecodeError::Base64(_))));

        let not_json = BASE64URL.encode("hello");
        assert!(matches!(
            decode_claims(&format!("a.{not_json}.b")),
            Err(DecodeError::Json(_))
        ));

        let array = BASE64URL.encode("[1,2]");
        assert!(matches!(
            decode_claims(&format!("a.{array}.b")),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_missing_exp() {
        let token = encode_unsigned(&json!({ "sub": "alice" }));
        assert!(matches!(decode_claims(&token), Err(DecodeError::MissingExp)));

        let token = encode_unsigned(&json!({ "exp": "soon" }));
        assert!(matches!(decode_claims(&token), Err(DecodeError::MissingExp)));
    }
}
