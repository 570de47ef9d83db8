//! Signed, time-bounded identity tokens.
//!
//! Tokens are HS256 JWTs. Unlike registered JWT claims, `iat` and `exp` are
//! Unix timestamps in **milliseconds** so a lifetime configured in
//! milliseconds is honoured exactly.
//!
//! # Claims
//!
//! ```json
//! {
//!   "sub": "alice",
//!   "iat": 1735603200000,
//!   "exp": 1735689600000,
//!   "role": "USER",
//!   "uid": 7
//! }
//! ```
//!
//! Every claim besides `sub`, `iat` and `exp` is carried in [`Claims::extra`].
//!
//! # Expiry
//!
//! `jsonwebtoken`'s own `exp` validation is switched off. Expiry is decided by
//! [`check_expiry`] against a caller supplied `now`, and every gate reaches it
//! through [`TokenCodec::parse_and_verify`].

use std::fmt;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IssueError, KeyError, TokenError};

/// Minimum decoded length of the HMAC signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime (24 hours).
pub const DEFAULT_LIFETIME_MS: u64 = 86_400_000;

const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// Decoded token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,

    /// Issued at, Unix milliseconds.
    pub iat: i64,

    /// Expiry, Unix milliseconds.
    pub exp: i64,

    /// Additional claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.exp)
    }

    /// Look up an extra claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// An issued token. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Creates and verifies tokens with a process-wide secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenCodec {
    /// Create a codec from raw secret bytes.
    pub fn with_secret(secret: &[u8], lifetime: Duration) -> Result<Self, KeyError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::TooShort {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        })
    }

    /// Create a codec from a base64 encoded secret.
    pub fn from_base64_secret(secret: &str, lifetime: Duration) -> Result<Self, KeyError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(secret.trim())
            .map_err(|e| KeyError::InvalidBase64(e.to_string()))?;
        Self::with_secret(&bytes, lifetime)
    }

    /// Configured token lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `subject`, valid from `now` for the configured lifetime.
    ///
    /// Keys of `extra` that collide with `sub`, `iat` or `exp` are dropped.
    pub fn issue(
        &self,
        subject: &str,
        mut extra: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Token, IssueError> {
        if subject.trim().is_empty() {
            return Err(IssueError::EmptySubject);
        }

        let lifetime_ms =
            i64::try_from(self.lifetime.as_millis()).map_err(|_| IssueError::LifetimeOutOfRange)?;
        let iat = now.timestamp_millis();
        let exp = iat
            .checked_add(lifetime_ms)
            .ok_or(IssueError::LifetimeOutOfRange)?;

        for reserved in RESERVED_CLAIMS {
            extra.remove(reserved);
        }

        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp,
            extra,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IssueError::Signing(e.to_string()))?;

        Ok(Token(token))
    }

    /// Verify the signature, decode the claims and check expiry against `now`.
    pub fn parse_and_verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::MissingToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::MalformedToken(e.to_string()),
            })?;

        check_expiry(&token_data.claims, now)?;

        Ok(token_data.claims)
    }
}

/// The one expiry rule: a token is expired once `exp <= now`.
pub fn check_expiry(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= now.timestamp_millis() {
        return Err(TokenError::ExpiredToken {
            expired_at: claims.expires_at(),
            now,
        });
    }
    Ok(())
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec(lifetime_ms: u64) -> TokenCodec {
        TokenCodec::with_secret(SECRET, Duration::from_millis(lifetime_ms)).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn at(offset_ms: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::milliseconds(offset_ms)
    }

    #[test]
    fn test_issue_then_verify() {
        let codec = codec(DEFAULT_LIFETIME_MS);
        let token = codec.issue("alice", Map::new(), t0()).unwrap();

        let claims = codec.parse_and_verify(token.as_str(), t0()).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.issued_at(), t0());
        assert_eq!(claims.expires_at(), at(DEFAULT_LIFETIME_MS as i64));
    }

    #[test]
    fn test_alice_one_second_lifetime() {
        let codec = codec(1000);
        let token = codec.issue("alice", Map::new(), t0()).unwrap();

        let claims = codec.parse_and_verify(token.as_str(), at(500)).unwrap();
        assert_eq!(claims.sub, "alice");

        let err = codec.parse_and_verify(token.as_str(), at(1500)).unwrap_err();
        assert_eq!(
            err,
            TokenError::ExpiredToken {
                expired_at: at(1000),
                now: at(1500),
            }
        );
    }

    #[test]
    fn test_expiry_boundary_and_idempotence() {
        let codec = codec(1000);
        let token = codec.issue("alice", Map::new(), t0()).unwrap();

        assert!(codec.parse_and_verify(token.as_str(), at(999)).is_ok());

        let first = codec.parse_and_verify(token.as_str(), at(1000)).unwrap_err();
        let second = codec.parse_and_verify(token.as_str(), at(1000)).unwrap_err();
        assert!(first.is_expired());
        assert_eq!(first, second);
    }

    #[test]
    fn test_extra_claims_round_trip_and_reserved_dropped() {
        let codec = codec(1000);
        let mut extra = Map::new();
        extra.insert("role".into(), json!("ADMIN"));
        extra.insert("uid".into(), json!(7));
        extra.insert("exp".into(), json!(i64::MAX));

        let token = codec.issue("alice", extra, t0()).unwrap();
        let claims = codec.parse_and_verify(token.as_str(), t0()).unwrap();

        assert_eq!(claims.get("role"), Some(&json!("ADMIN")));
        assert_eq!(claims.get("uid"), Some(&json!(7)));
        assert_eq!(claims.exp, at(1000).timestamp_millis());
        assert!(claims.get("exp").is_none());
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = codec(1000).issue("alice", Map::new(), t0()).unwrap();
        let other =
            TokenCodec::with_secret(b"ffffffffffffffffffffffffffffffff", Duration::from_secs(1))
                .unwrap();

        assert_eq!(
            other.parse_and_verify(token.as_str(), t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = codec(1000);
        let token = codec.issue("alice", Map::new(), t0()).unwrap();
        let other = codec.issue("mallory", Map::new(), t0()).unwrap();

        let parts: Vec<&str> = token.as_str().split('.').collect();
        let other_parts: Vec<&str> = other.as_str().split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(
            codec.parse_and_verify(&forged, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec(1000);
        assert!(matches!(
            codec.parse_and_verify("bad", t0()),
            Err(TokenError::MalformedToken(_))
        ));
        assert_eq!(
            codec.parse_and_verify("  ", t0()),
            Err(TokenError::MissingToken)
        );
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let codec = codec(1000);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": "alice", "iat": 0 }),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            codec.parse_and_verify(&token, t0()),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_secret_length_enforced() {
        assert!(matches!(
            TokenCodec::with_secret(b"short", Duration::from_secs(1)),
            Err(KeyError::TooShort { len: 5, min: 32 })
        ));
    }

    #[test]
    fn test_from_base64_secret() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(SECRET);
        let codec = TokenCodec::from_base64_secret(&encoded, Duration::from_millis(250)).unwrap();
        assert_eq!(codec.lifetime(), Duration::from_millis(250));

        assert!(matches!(
            TokenCodec::from_base64_secret("not base64!!", Duration::from_secs(1)),
            Err(KeyError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_empty_subject_rejected() {
        assert!(matches!(
            codec(1000).issue(" ", Map::new(), t0()),
            Err(IssueError::EmptySubject)
        ));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = codec(1000).issue("alice", Map::new(), t0()).unwrap();
        assert_eq!(format!("{:?}", token), "Token(..)");
    }
}
