//! Account endpoints. These sit under the bypass prefix and need no token.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    routing::post,
    Json, Router,
};
use tracklog_core::Role;
use tracklog_proto::{AuthRequest, AuthResponse, RegisterRequest, RoleName};

use super::validated;
use crate::error::{ApiError, ApiErrorKind};
use crate::state::AppState;
use crate::users::{NewUser, UserRecord, UserStoreError};

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Register a user and return a token.
async fn register(
    State(state): State<AppState>,
    uri: Uri,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let path = uri.path();
    let request = validated(body, path)?;

    let role = match request.role {
        RoleName::User => Role::User,
        RoleName::Admin => Role::Admin,
    };
    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        role,
    };

    let user = state.users.register(new_user).await.map_err(|e| match e {
        UserStoreError::DuplicateUsername(_) | UserStoreError::DuplicateEmail(_) => {
            tracing::warn!(error = %e, "registration rejected");
            ApiErrorKind::Conflict(e.to_string()).at(path)
        }
        UserStoreError::Hashing(_) => {
            tracing::error!(error = %e, "registration failed");
            ApiErrorKind::Internal("Registration failed due to an unexpected error".to_string())
                .at(path)
        }
    })?;

    token_response(&state, &user, path)
}

/// Exchange credentials for a token.
async fn login(
    State(state): State<AppState>,
    uri: Uri,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let path = uri.path();
    let request = validated(body, path)?;

    let Some(user) = state
        .users
        .verify_credentials(&request.username, &request.password)
        .await
    else {
        tracing::warn!(username = %request.username, "login failed: invalid credentials");
        return Err(ApiErrorKind::BadCredentials.at(path));
    };

    tracing::info!(username = %user.username, "user authenticated");
    token_response(&state, &user, path)
}

fn token_response(
    state: &AppState,
    user: &UserRecord,
    path: &str,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = state.issue_token(user).map_err(|e| {
        tracing::error!(username = %user.username, error = %e, "token generation failed");
        ApiErrorKind::TokenGeneration.at(path)
    })?;

    Ok(Json(AuthResponse {
        token: token.into_string(),
    }))
}
