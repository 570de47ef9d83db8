//! In-memory user store and its [`UserDirectory`] implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracklog_core::{DirectoryError, Identity, Role, UserDirectory};

/// User store errors.
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("User with username {0} already exists")]
    DuplicateUsername(String),

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// A registered user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone(), vec![self.role])
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Users keyed by id, with unique username and email indexes.
pub struct UserStore {
    users: DashMap<u64, UserRecord>,
    by_username: DashMap<String, u64>,
    by_email: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_username: DashMap::new(),
            by_email: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a user, hashing the password off the async runtime.
    pub async fn register(&self, new_user: NewUser) -> Result<UserRecord, UserStoreError> {
        let NewUser {
            username,
            email,
            password,
            role,
        } = new_user;

        if self.by_username.contains_key(&username) {
            return Err(UserStoreError::DuplicateUsername(username));
        }
        let email_key = email.to_lowercase();
        if self.by_email.contains_key(&email_key) {
            return Err(UserStoreError::DuplicateEmail(email));
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| UserStoreError::Hashing(e.to_string()))??;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        // Reserve both keys; a concurrent registration may have won since the check above.
        match self.by_username.entry(username.clone()) {
            Entry::Occupied(_) => return Err(UserStoreError::DuplicateUsername(username)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        match self.by_email.entry(email_key) {
            Entry::Occupied(_) => {
                self.by_username.remove(&username);
                return Err(UserStoreError::DuplicateEmail(email));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let record = UserRecord {
            id,
            username,
            email,
            password_hash,
            role,
            created_at: Utc::now(),
        };
        self.users.insert(id, record.clone());

        tracing::info!(user_id = id, username = %record.username, "user registered");
        Ok(record)
    }

    /// Check a username and password. Unknown users and wrong passwords both yield `None`.
    ///
    /// An unknown user is verified against a dummy hash so both cases cost one argon2 run.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Option<UserRecord> {
        let record = self.find_by_username(username);
        let hash = record.as_ref().map(|record| record.password_hash.clone());
        let password = password.to_string();

        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => verify_password(&hash, &password),
            None => {
                if let Some(dummy) = dummy_hash() {
                    verify_password(dummy, &password);
                }
                false
            }
        })
        .await
        .unwrap_or(false);

        if verified {
            record
        } else {
            None
        }
    }

    pub fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        let id = *self.by_username.get(username)?;
        self.find_by_id(id)
    }

    pub fn exists(&self, id: u64) -> bool {
        self.users.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn load_by_subject(&self, subject: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.find_by_username(subject).map(|record| record.identity()))
    }
}

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| UserStoreError::Hashing(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| UserStoreError::Hashing(e.to_string()))?;

    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserStoreError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Hash checked for unknown usernames, created once with the default parameters.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("tracklog-unknown-user").ok())
        .as_deref()
}

/// Verify a password against a PHC string.
pub fn verify_password(phc: &str, password: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
