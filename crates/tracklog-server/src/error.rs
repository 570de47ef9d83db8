//! Error types for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracklog_core::{KeyError, TokenError};
use tracklog_proto::{ErrorResponse, FieldErrors};

/// Startup and runtime errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Signing secret could not be loaded.
    #[error("signing key error: {0}")]
    Key(#[from] KeyError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What went wrong at the HTTP boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorKind {
    /// The bearer token has expired.
    TokenExpired {
        expired_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    /// Any other token rejection.
    InvalidToken,
    /// A protected handler ran without a bound identity.
    Unauthenticated,
    /// Login with unknown user or wrong password.
    BadCredentials,
    /// Username or email already taken.
    Conflict(String),
    /// Body failed field validation.
    Validation(FieldErrors),
    /// Body or query could not be parsed.
    BadRequest(String),
    /// Referenced user does not exist.
    UserNotFound(u64),
    /// A token could not be issued.
    TokenGeneration,
    /// Anything else.
    Internal(String),
}

impl ApiErrorKind {
    /// Attach the request path the error is reported for.
    pub fn at(self, path: impl Into<String>) -> ApiError {
        ApiError {
            kind: self,
            path: path.into(),
        }
    }
}

impl From<TokenError> for ApiErrorKind {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::ExpiredToken { expired_at, now } => {
                ApiErrorKind::TokenExpired { expired_at, now }
            }
            _ => ApiErrorKind::InvalidToken,
        }
    }
}

/// An error rendered as an [`ErrorResponse`] body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub path: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ApiErrorKind::TokenExpired { .. }
            | ApiErrorKind::InvalidToken
            | ApiErrorKind::Unauthenticated
            | ApiErrorKind::BadCredentials => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Conflict(_) => StatusCode::CONFLICT,
            ApiErrorKind::Validation(_) | ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::UserNotFound(_) => StatusCode::NOT_FOUND,
            ApiErrorKind::TokenGeneration | ApiErrorKind::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the response body.
    pub fn body(&self) -> ErrorResponse {
        let status = self.status().as_u16();
        let now = Utc::now();

        match &self.kind {
            ApiErrorKind::TokenExpired { expired_at, now } => ErrorResponse::new(
                status,
                "Token expired",
                "Your session has expired. Please log in again.",
                &self.path,
                *now,
            )
            .with_expiry(*expired_at, *now),
            ApiErrorKind::InvalidToken => ErrorResponse::new(
                status,
                "Unauthorized",
                "Invalid authentication token",
                &self.path,
                now,
            ),
            ApiErrorKind::Unauthenticated => ErrorResponse::new(
                status,
                "Unauthorized",
                "Full authentication is required to access this resource",
                &self.path,
                now,
            ),
            ApiErrorKind::BadCredentials => ErrorResponse::new(
                status,
                "Authentication failed",
                "Invalid username or password",
                &self.path,
                now,
            ),
            ApiErrorKind::Conflict(message) => {
                ErrorResponse::new(status, "Registration failed", message, &self.path, now)
            }
            ApiErrorKind::Validation(fields) => ErrorResponse::new(
                status,
                "Invalid request data",
                "Validation failed",
                &self.path,
                now,
            )
            .with_field_errors(fields.clone().into_map()),
            ApiErrorKind::BadRequest(message) => {
                ErrorResponse::new(status, "Bad request", message, &self.path, now)
            }
            ApiErrorKind::UserNotFound(id) => ErrorResponse::new(
                status,
                "User not found",
                format!("User with id {} not found", id),
                &self.path,
                now,
            ),
            ApiErrorKind::TokenGeneration => ErrorResponse::new(
                status,
                "Token generation failed",
                "Failed to generate authentication token",
                &self.path,
                now,
            ),
            ApiErrorKind::Internal(message) => {
                ErrorResponse::new(status, "Internal server error", message, &self.path, now)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
