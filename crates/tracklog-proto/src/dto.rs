//! JSON request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{require, FieldErrors, Validate, MIN_PASSWORD_LEN};

/// Role requested at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleName {
    #[default]
    User,
    Admin,
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl AuthRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Validate for AuthRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "username", &self.username, "Username is mandatory");
        validate_password(&mut errors, &self.password);
        errors.into_result()
    }
}

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: RoleName,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: RoleName::User,
        }
    }

    pub fn with_role(mut self, role: RoleName) -> Self {
        self.role = role;
        self
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "username", &self.username, "Username is mandatory");
        require(&mut errors, "email", &self.email, "Email is mandatory");
        if !self.email.trim().is_empty() && !looks_like_email(&self.email) {
            errors.add("email", "Email should be valid");
        }
        validate_password(&mut errors, &self.password);
        errors.into_result()
    }
}

/// Token returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Activity submitted over HTTP or `SEND /app/activities`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub details: String,
}

impl ActivityRequest {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
        }
    }
}

impl Validate for ActivityRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "action", &self.action, "Action is required");
        require(&mut errors, "details", &self.details, "Details are required");
        errors.into_result()
    }
}

/// A logged activity as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// One page of results, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `items` into the requested page.
    pub fn of(items: Vec<T>, page: usize, size: usize) -> Self {
        let size = size.max(1);
        let total_elements = items.len();
        let total_pages = total_elements.div_ceil(size);
        let content = items.into_iter().skip(page.saturating_mul(size)).take(size).collect();

        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn validate_password(errors: &mut FieldErrors, password: &str) {
    require(errors, "password", password, "Password is mandatory");
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password should be 8 characters long minimum");
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
