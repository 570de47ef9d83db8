//! The user directory collaborator.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::identity::Identity;

/// Maps token subjects to identity records.
///
/// Implementations own any caching or retry policy. `Ok(None)` means the
/// subject is unknown; `Err` means the directory itself failed.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn load_by_subject(&self, subject: &str) -> Result<Option<Identity>, DirectoryError>;
}

/// A fixed, in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    identities: HashMap<String, Identity>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity, keyed by its subject.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.insert(identity.subject.clone(), identity);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn load_by_subject(&self, subject: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.identities.get(subject).cloned())
    }
}
