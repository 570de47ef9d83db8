//! Handshake authentication for `/ws`.
//!
//! The token is taken from the `token` query parameter, falling back to the
//! `Authorization: Bearer` header. A refused handshake never upgrades, so the
//! peer sees the connection fail rather than an in-band error.

use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use tracklog_core::{extract_bearer, AuthenticationOutcome, Identity, TokenAuthenticator};

/// Attribute key holding the handshake identity.
pub const USER_ATTRIBUTE: &str = "user";

/// What the handshake gate sees of a connection request.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRequest {
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl ConnectionRequest {
    pub fn new(query: Option<&str>, headers: HeaderMap) -> Self {
        Self {
            query: query.map(str::to_string),
            headers,
        }
    }

    /// The token, from `?token=` first and `Authorization: Bearer` second.
    pub fn token(&self) -> Option<String> {
        let from_query = self.query.as_deref().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == "token")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
        });

        from_query.or_else(|| {
            self.headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(extract_bearer)
                .map(str::to_string)
        })
    }
}

/// Attributes bound to one connection for its lifetime.
#[derive(Debug, Clone, Default)]
pub struct ConnectionAttributes {
    values: HashMap<String, Identity>,
}

impl ConnectionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, identity: Identity) {
        self.values.insert(key.into(), identity);
    }

    pub fn get(&self, key: &str) -> Option<&Identity> {
        self.values.get(key)
    }

    /// The identity admitted at the handshake.
    pub fn user(&self) -> Option<&Identity> {
        self.get(USER_ATTRIBUTE)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Gate run once before a WebSocket upgrade is accepted.
#[derive(Clone)]
pub struct ConnectionAuthenticator {
    authenticator: TokenAuthenticator,
}

impl ConnectionAuthenticator {
    pub fn new(authenticator: TokenAuthenticator) -> Self {
        Self { authenticator }
    }

    /// Decide whether to accept the connection.
    ///
    /// On success the identity is stored under [`USER_ATTRIBUTE`]. On any
    /// failure `attributes` is left untouched.
    pub async fn before_accept(
        &self,
        request: &ConnectionRequest,
        attributes: &mut ConnectionAttributes,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(token) = request.token() else {
            tracing::warn!("connection refused: no token in query or Authorization header");
            return false;
        };

        match self.authenticator.authenticate(&token, now).await {
            AuthenticationOutcome::Authenticated(identity) => {
                tracing::info!(subject = %identity.subject, "connection handshake authenticated");
                attributes.insert(USER_ATTRIBUTE, identity);
                true
            }
            AuthenticationOutcome::Rejected(reason) => {
                tracing::warn!(error = %reason, "connection refused: token rejected");
                false
            }
        }
    }
}
