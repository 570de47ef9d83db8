//! Registry of open WebSocket connections.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// A registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: String,
    /// Subject admitted at the handshake.
    pub subject: String,
    pub connected_at: DateTime<Utc>,
}

/// Tracks open connections by id.
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection and return its id.
    pub fn register(&self, subject: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.connections.insert(
            id.clone(),
            ConnectionInfo {
                id: id.clone(),
                subject: subject.to_string(),
                connected_at: Utc::now(),
            },
        );
        tracing::info!(connection_id = %id, subject = %subject, "connection registered");
        id
    }

    /// Remove a connection, returning what was registered for it.
    pub fn remove(&self, id: &str) -> Option<ConnectionInfo> {
        self.connections.remove(id).map(|(_, info)| info)
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
