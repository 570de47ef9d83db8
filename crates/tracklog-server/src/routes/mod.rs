//! HTTP route handlers.

pub mod activities;
pub mod auth;
pub mod health;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use tracklog_proto::Validate;

use crate::error::{ApiError, ApiErrorKind};

/// Unwrap a JSON body and run its field validation.
pub(crate) fn validated<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
    path: &str,
) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|e| ApiErrorKind::BadRequest(e.body_text()).at(path))?;
    value
        .validate()
        .map_err(|fields| ApiErrorKind::Validation(fields).at(path))?;
    Ok(value)
}

/// Unwrap query parameters.
pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>, path: &str) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| ApiErrorKind::BadRequest(e.body_text()).at(path))
}
