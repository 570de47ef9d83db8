//! Authentication error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why a token did not yield an identity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    /// No credential was presented.
    #[error("authentication token is missing")]
    MissingToken,

    /// The token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token was signed with a different key or altered.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The token's expiry is not after `now`.
    #[error("token expired at {expired_at}, current time {now}")]
    ExpiredToken {
        /// Expiry embedded in the token.
        expired_at: DateTime<Utc>,
        /// Time the check ran.
        now: DateTime<Utc>,
    },

    /// The directory has no record for the token's subject.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// The directory failed or did not answer in time.
    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl TokenError {
    /// Whether this is an expiry, the one rejection reported with details.
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::ExpiredToken { .. })
    }
}

/// Token generation errors.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signing secret configuration errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing secret is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("signing secret too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },
}

/// Failure reported by a [`UserDirectory`](crate::directory::UserDirectory).
#[derive(Debug, Clone, Error)]
#[error("directory error: {0}")]
pub struct DirectoryError(pub String);

impl DirectoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TokenError::UnknownSubject("mallory".to_string());
        assert!(err.to_string().contains("mallory"));

        let err = KeyError::TooShort { len: 4, min: 32 };
        assert!(err.to_string().contains("4 bytes"));
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(TokenError::ExpiredToken { expired_at: now, now }.is_expired());
        assert!(!TokenError::InvalidSignature.is_expired());
        assert!(!TokenError::MissingToken.is_expired());
    }
}
