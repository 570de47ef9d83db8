//! The verify → expiry → resolve path shared by every gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::TokenError;
use crate::identity::Identity;
use crate::resolver::IdentityResolver;
use crate::token::TokenCodec;

/// Result of authenticating one credential.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationOutcome {
    Authenticated(Identity),
    Rejected(TokenError),
}

impl AuthenticationOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationOutcome::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthenticationOutcome::Authenticated(identity) => Some(identity),
            AuthenticationOutcome::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Identity, TokenError> {
        match self {
            AuthenticationOutcome::Authenticated(identity) => Ok(identity),
            AuthenticationOutcome::Rejected(reason) => Err(reason),
        }
    }
}

impl From<Result<Identity, TokenError>> for AuthenticationOutcome {
    fn from(result: Result<Identity, TokenError>) -> Self {
        match result {
            Ok(identity) => AuthenticationOutcome::Authenticated(identity),
            Err(reason) => AuthenticationOutcome::Rejected(reason),
        }
    }
}

/// Strip a `Bearer ` scheme from an `Authorization` value.
///
/// Returns `None` for other schemes or an empty credential.
pub fn extract_bearer(value: &str) -> Option<&str> {
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Codec plus resolver: the only way a token becomes an [`Identity`].
#[derive(Clone)]
pub struct TokenAuthenticator {
    codec: Arc<TokenCodec>,
    resolver: IdentityResolver,
}

impl TokenAuthenticator {
    pub fn new(codec: Arc<TokenCodec>, resolver: IdentityResolver) -> Self {
        Self { codec, resolver }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate a raw token.
    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> AuthenticationOutcome {
        let claims = match self.codec.parse_and_verify(token, now) {
            Ok(claims) => claims,
            Err(reason) => return AuthenticationOutcome::Rejected(reason),
        };

        let outcome: AuthenticationOutcome = self.resolver.resolve(&claims.sub).await.into();
        if let AuthenticationOutcome::Authenticated(identity) = &outcome {
            tracing::debug!(subject = %identity.subject, "token authenticated");
        }
        outcome
    }

    /// Authenticate an `Authorization` header value, if any.
    ///
    /// A missing header or a non-bearer scheme is `MissingToken`.
    pub async fn authenticate_header(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthenticationOutcome {
        match header.and_then(extract_bearer) {
            Some(token) => self.authenticate(token, now).await,
            None => AuthenticationOutcome::Rejected(TokenError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::identity::Role;
    use serde_json::Map;
    use std::time::Duration;

    fn authenticator(lifetime_ms: u64) -> TokenAuthenticator {
        let codec = TokenCodec::with_secret(
            b"0123456789abcdef0123456789abcdef",
            Duration::from_millis(lifetime_ms),
        )
        .unwrap();
        let directory =
            StaticDirectory::new().with_identity(Identity::new(1, "alice", vec![Role::User]));
        TokenAuthenticator::new(Arc::new(codec), IdentityResolver::new(Arc::new(directory)))
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("bearer abc "), Some("abc"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("abc"), None);
    }

    #[tokio::test]
    async fn test_authenticate_issued_token() {
        let auth = authenticator(60_000);
        let now = Utc::now();
        let token = auth.codec().issue("alice", Map::new(), now).unwrap();

        let outcome = auth.authenticate(token.as_str(), now).await;
        assert!(outcome.is_authenticated());
        assert_eq!(outcome.identity().map(|i| i.subject.as_str()), Some("alice"));
    }

    #[tokio::test]
    async fn test_expired_token_skips_resolution() {
        let auth = authenticator(1000);
        let now = Utc::now();
        let token = auth.codec().issue("nobody", Map::new(), now).unwrap();

        // "nobody" is unknown, so reaching the directory would yield UnknownSubject.
        let later = now + chrono::Duration::milliseconds(1500);
        let outcome = auth.authenticate(token.as_str(), later).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(TokenError::ExpiredToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let auth = authenticator(60_000);
        let now = Utc::now();
        let token = auth.codec().issue("bob", Map::new(), now).unwrap();

        let outcome = auth.authenticate(token.as_str(), now).await;
        assert_eq!(
            outcome.into_result(),
            Err(TokenError::UnknownSubject("bob".to_string()))
        );
    }

    #[tokio::test]
    async fn test_authenticate_header() {
        let auth = authenticator(60_000);
        let now = Utc::now();
        let token = auth.codec().issue("alice", Map::new(), now).unwrap();
        let header = format!("Bearer {}", token.as_str());

        assert!(auth.authenticate_header(Some(&header), now).await.is_authenticated());
        assert_eq!(
            auth.authenticate_header(None, now).await,
            AuthenticationOutcome::Rejected(TokenError::MissingToken)
        );
        assert_eq!(
            auth.authenticate_header(Some("Basic abc"), now).await,
            AuthenticationOutcome::Rejected(TokenError::MissingToken)
        );
    }
}
