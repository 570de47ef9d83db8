//! Application state shared across all routes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use tracklog_core::{Clock, IdentityResolver, IssueError, SystemClock, Token, TokenAuthenticator, TokenCodec};

use crate::activity::ActivityStore;
use crate::auth::{ConnectionAuthenticator, RequestAuthenticator};
use crate::config::ServerConfig;
use crate::error::Error;
use crate::pubsub::ActivityBroadcaster;
use crate::registry::ConnectionRegistry;
use crate::users::{UserRecord, UserStore};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Time source for issuing and verifying tokens.
    pub clock: Arc<dyn Clock>,
    /// Token verification and identity resolution.
    pub authenticator: TokenAuthenticator,
    /// HTTP request gate.
    pub request_gate: RequestAuthenticator,
    /// WebSocket handshake gate.
    pub connection_gate: ConnectionAuthenticator,
    /// Registered users; also the user directory.
    pub users: Arc<UserStore>,
    /// Activity log.
    pub activities: Arc<ActivityStore>,
    /// Activity fan-out.
    pub broadcaster: ActivityBroadcaster,
    /// Open WebSocket connections.
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Create state using the wall clock.
    pub fn new(config: ServerConfig) -> Result<Self, Error> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state with an explicit clock.
    ///
    /// The signing secret is decoded here, once, and shared read-only by every gate.
    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let codec = Arc::new(TokenCodec::from_base64_secret(
            &config.jwt_secret,
            config.token_lifetime,
        )?);

        let users = Arc::new(UserStore::new());
        let resolver =
            IdentityResolver::new(users.clone()).with_timeout(config.directory_timeout);
        let authenticator = TokenAuthenticator::new(codec, resolver);

        Ok(Self {
            request_gate: RequestAuthenticator::new(authenticator.clone(), config.auth_prefix.clone()),
            connection_gate: ConnectionAuthenticator::new(authenticator.clone()),
            authenticator,
            users,
            activities: Arc::new(ActivityStore::new()),
            broadcaster: ActivityBroadcaster::new(config.broadcast_capacity),
            connections: Arc::new(ConnectionRegistry::new()),
            clock,
            config: Arc::new(config),
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a token for a user, carrying `role` and `uid` claims.
    pub fn issue_token(&self, user: &UserRecord) -> Result<Token, IssueError> {
        let mut extra = Map::new();
        extra.insert("role".to_string(), json!(user.role.as_str()));
        extra.insert("uid".to_string(), json!(user.id));

        self.authenticator
            .codec()
            .issue(&user.username, extra, self.now())
    }
}
