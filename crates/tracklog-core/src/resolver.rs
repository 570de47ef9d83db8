//! Turns a verified subject into an [`Identity`].

use std::sync::Arc;
use std::time::Duration;

use crate::directory::UserDirectory;
use crate::error::TokenError;
use crate::identity::Identity;

/// Default bound on a single directory lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves subjects through the user directory with a lookup timeout.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Set the lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `subject`.
    ///
    /// A lookup that fails or outlives the timeout is `DirectoryUnavailable`;
    /// a subject the directory does not know is `UnknownSubject`.
    pub async fn resolve(&self, subject: &str) -> Result<Identity, TokenError> {
        let lookup = self.directory.load_by_subject(subject);

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Some(identity))) => Ok(identity),
            Ok(Ok(None)) => {
                tracing::warn!(subject = %subject, "token subject not found in directory");
                Err(TokenError::UnknownSubject(subject.to_string()))
            }
            Ok(Err(e)) => {
                tracing::error!(subject = %subject, error = %e, "directory lookup failed");
                Err(TokenError::DirectoryUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    subject = %subject,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "directory lookup timed out"
                );
                Err(TokenError::DirectoryUnavailable(format!(
                    "lookup timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::error::DirectoryError;
    use crate::identity::Role;
    use async_trait::async_trait;

    struct FailingDirectory;

    #[async_trait]
    impl UserDirectory for FailingDirectory {
        async fn load_by_subject(&self, _: &str) -> Result<Option<Identity>, DirectoryError> {
            Err(DirectoryError::new("connection refused"))
        }
    }

    struct StalledDirectory;

    #[async_trait]
    impl UserDirectory for StalledDirectory {
        async fn load_by_subject(&self, _: &str) -> Result<Option<Identity>, DirectoryError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_resolve_known_subject() {
        let directory = StaticDirectory::new().with_identity(Identity::new(3, "alice", vec![Role::User]));
        let resolver = IdentityResolver::new(Arc::new(directory));

        let identity = resolver.resolve("alice").await.unwrap();
        assert_eq!(identity.user_id, 3);
        assert!(identity.has_role(Role::User));
    }

    #[tokio::test]
    async fn test_resolve_unknown_subject() {
        let resolver = IdentityResolver::new(Arc::new(StaticDirectory::new()));
        assert_eq!(
            resolver.resolve("ghost").await,
            Err(TokenError::UnknownSubject("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_directory_failure_is_unavailable() {
        let resolver = IdentityResolver::new(Arc::new(FailingDirectory));
        let err = resolver.resolve("alice").await.unwrap_err();
        assert!(matches!(err, TokenError::DirectoryUnavailable(msg) if msg.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_lookup_times_out() {
        let resolver = IdentityResolver::new(Arc::new(StalledDirectory))
            .with_timeout(Duration::from_millis(50));

        let err = resolver.resolve("alice").await.unwrap_err();
        assert!(matches!(err, TokenError::DirectoryUnavailable(msg) if msg.contains("timed out")));
    }
}
