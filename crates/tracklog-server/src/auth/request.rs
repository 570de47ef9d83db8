//! Per-request authentication.
//!
//! Runs as an axum middleware in front of every route. The resolved
//! [`Identity`] is attached to the request's own extensions, so each request
//! carries its own binding and nothing is shared between concurrent requests.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracklog_core::{AuthenticationOutcome, Identity, TokenAuthenticator, TokenError};

use crate::error::{ApiError, ApiErrorKind};
use crate::state::AppState;

/// Bearer-token gate for HTTP requests.
#[derive(Clone)]
pub struct RequestAuthenticator {
    authenticator: TokenAuthenticator,
    bypass_prefix: String,
}

impl RequestAuthenticator {
    pub fn new(authenticator: TokenAuthenticator, bypass_prefix: impl Into<String>) -> Self {
        Self {
            authenticator,
            bypass_prefix: bypass_prefix.into(),
        }
    }

    /// Whether `path` belongs to the unauthenticated surface.
    pub fn is_bypassed(&self, path: &str) -> bool {
        path.starts_with(&self.bypass_prefix)
    }

    /// Authenticate the `Authorization: Bearer` header.
    ///
    /// No header, or a non-bearer scheme, is `MissingToken`.
    pub async fn authenticate(&self, headers: &HeaderMap, now: DateTime<Utc>) -> AuthenticationOutcome {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        self.authenticator.authenticate_header(header, now).await
    }
}

/// Middleware binding the request's identity.
///
/// - paths under the bypass prefix go straight through
/// - no bearer token: continues without an identity
/// - rejected token: 401, with expiry details when the token expired
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let gate = &state.request_gate;
    let path = request.uri().path().to_string();

    if gate.is_bypassed(&path) {
        return next.run(request).await;
    }

    let outcome = gate.authenticate(request.headers(), state.now()).await;
    match outcome {
        AuthenticationOutcome::Authenticated(identity) => {
            tracing::debug!(subject = %identity.subject, path = %path, "request authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthenticationOutcome::Rejected(TokenError::MissingToken) => next.run(request).await,
        AuthenticationOutcome::Rejected(reason) => {
            if reason.is_expired() {
                tracing::warn!(path = %path, error = %reason, "request with expired token");
            } else {
                tracing::warn!(path = %path, error = %reason, "request with invalid token");
            }
            ApiErrorKind::from(reason).at(path).into_response()
        }
    }
}

/// The identity bound to the current request.
///
/// Rejects with 401 when the request carried no valid token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiErrorKind::Unauthenticated.at(parts.uri.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::Map;
    use std::sync::Arc;
    use std::time::Duration;
    use tracklog_core::{IdentityResolver, Role, StaticDirectory, TokenCodec};

    fn gate() -> RequestAuthenticator {
        let codec = TokenCodec::with_secret(
            b"0123456789abcdef0123456789abcdef",
            Duration::from_millis(1000),
        )
        .unwrap();
        let directory =
            StaticDirectory::new().with_identity(Identity::new(1, "alice", vec![Role::User]));
        let authenticator =
            TokenAuthenticator::new(Arc::new(codec), IdentityResolver::new(Arc::new(directory)));
        RequestAuthenticator::new(authenticator, "/api/auth/")
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bypass_prefix() {
        let gate = gate();
        assert!(gate.is_bypassed("/api/auth/login"));
        assert!(gate.is_bypassed("/api/auth/register"));
        assert!(!gate.is_bypassed("/api/activities"));
        assert!(!gate.is_bypassed("/api/authx"));
    }

    #[tokio::test]
    async fn test_no_header_is_missing_token() {
        let outcome = gate().authenticate(&HeaderMap::new(), Utc::now()).await;
        assert_eq!(outcome, AuthenticationOutcome::Rejected(TokenError::MissingToken));
    }

    #[tokio::test]
    async fn test_valid_and_expired_tokens() {
        let gate = gate();
        let now = Utc::now();
        let token = gate
            .authenticator
            .codec()
            .issue("alice", Map::new(), now)
            .unwrap();
        let headers = bearer(token.as_str());

        let outcome = gate.authenticate(&headers, now).await;
        assert_eq!(outcome.identity().map(|i| i.user_id), Some(1));

        let later = now + chrono::Duration::milliseconds(1500);
        let outcome = gate.authenticate(&headers, later).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(TokenError::ExpiredToken { .. })
        ));
    }
}
