//! Server configuration.

use std::fmt;
use std::time::Duration;

use clap::Parser;

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

/// Default token lifetime in milliseconds (24 hours).
pub const DEFAULT_TOKEN_LIFETIME_MS: u64 = 86_400_000;

/// Default bound on a single user directory lookup, in milliseconds.
pub const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 2_000;

/// Path prefix of the unauthenticated account endpoints.
pub const DEFAULT_AUTH_PREFIX: &str = "/api/auth/";

/// Number of recent activities sent to a new subscriber.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Capacity of the activity broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// tracklog server command line arguments.
#[derive(Debug, Parser)]
#[command(name = "tracklog-server")]
#[command(about = "Multi-user activity log with authenticated real-time updates")]
pub struct Args {
    /// Address to listen on for HTTP and WebSocket connections.
    #[arg(short, long, env = "TRACKLOG_LISTEN", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen: String,

    /// Base64 encoded HMAC secret used to sign tokens (at least 32 bytes decoded).
    #[arg(long, env = "TRACKLOG_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Token lifetime in milliseconds.
    #[arg(long, env = "TRACKLOG_TOKEN_LIFETIME_MS", default_value_t = DEFAULT_TOKEN_LIFETIME_MS)]
    pub token_lifetime_ms: u64,

    /// Timeout (ms) for a single user directory lookup.
    #[arg(long, env = "TRACKLOG_DIRECTORY_TIMEOUT_MS", default_value_t = DEFAULT_DIRECTORY_TIMEOUT_MS)]
    pub directory_timeout_ms: u64,

    /// Requests under this path prefix skip token authentication.
    #[arg(long, default_value = DEFAULT_AUTH_PREFIX)]
    pub auth_prefix: String,

    /// Number of recent activities sent when a client subscribes.
    #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    pub recent_limit: usize,

    /// Capacity of the activity broadcast channel.
    #[arg(long, default_value_t = DEFAULT_BROADCAST_CAPACITY)]
    pub broadcast_capacity: usize,
}

/// tracklog server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: String,
    /// Base64 encoded signing secret.
    pub jwt_secret: String,
    /// Lifetime of issued tokens.
    pub token_lifetime: Duration,
    /// Bound on a single directory lookup.
    pub directory_timeout: Duration,
    /// Path prefix that bypasses request authentication.
    pub auth_prefix: String,
    /// Size of the snapshot sent to new subscribers.
    pub recent_limit: usize,
    /// Capacity of the activity broadcast channel.
    pub broadcast_capacity: usize,
}

impl ServerConfig {
    /// Create a configuration with the given base64 signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDRESS.to_string(),
            jwt_secret: jwt_secret.into(),
            token_lifetime: Duration::from_millis(DEFAULT_TOKEN_LIFETIME_MS),
            directory_timeout: Duration::from_millis(DEFAULT_DIRECTORY_TIMEOUT_MS),
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }

    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the token lifetime.
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Set the directory lookup timeout.
    pub fn with_directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory_timeout = timeout;
        self
    }

    /// Set the unauthenticated path prefix.
    pub fn with_auth_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auth_prefix = prefix.into();
        self
    }

    /// Set the subscriber snapshot size.
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Set the broadcast channel capacity.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        ServerConfig::new(args.jwt_secret.clone())
            .with_listen_addr(args.listen.clone())
            .with_token_lifetime(Duration::from_millis(args.token_lifetime_ms))
            .with_directory_timeout(Duration::from_millis(args.directory_timeout_ms))
            .with_auth_prefix(args.auth_prefix.clone())
            .with_recent_limit(args.recent_limit)
            .with_broadcast_capacity(args.broadcast_capacity)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .field("directory_timeout", &self.directory_timeout)
            .field("auth_prefix", &self.auth_prefix)
            .field("recent_limit", &self.recent_limit)
            .field("broadcast_capacity", &self.broadcast_capacity)
            .finish()
    }
}
