//! Resolved principals.

use serde::{Deserialize, Serialize};

/// Role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Authority string checked by authorization rules.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// A principal resolved from a verified token.
///
/// Owned by whichever request or connection produced it and never stored in
/// shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Directory identifier of the user.
    pub user_id: u64,
    /// Token subject (the username).
    pub subject: String,
    /// Granted roles.
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(user_id: u64, subject: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            subject: subject.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn authorities(&self) -> Vec<&'static str> {
        self.roles.iter().map(Role::authority).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorities() {
        let identity = Identity::new(1, "alice", vec![Role::User, Role::Admin]);
        assert!(identity.has_role(Role::Admin));
        assert_eq!(identity.authorities(), vec!["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::User);
    }
}
