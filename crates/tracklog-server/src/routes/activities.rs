//! Activity log endpoints. All require a bound identity.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracklog_proto::{ActivityRequest, ActivityResponse, Page};

use super::{query, validated};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiErrorKind};
use crate::state::AppState;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Activity routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/activities", post(log_activity).get(list_activities))
        .route("/api/activities/user/:user_id", get(user_activities))
        .route("/api/activities/search", get(search_activities))
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// `?page&size`
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

/// `?userId&startTime&endTime&page&size`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub user_id: Option<u64>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

/// Log an activity as the current user and broadcast it.
async fn log_activity(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    uri: Uri,
    body: Result<Json<ActivityRequest>, JsonRejection>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let request = validated(body, uri.path())?;

    let activity = state.activities.log(&identity, request, state.now());
    tracing::info!(
        subject = %identity.subject,
        activity_id = activity.id,
        action = %activity.action,
        "activity logged"
    );
    state.broadcaster.publish(activity.clone());

    Ok(Json(activity))
}

/// All activities, newest first.
async fn list_activities(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    uri: Uri,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = query(params, uri.path())?;
    Ok(page_response(state.activities.all(), params.page, params.size))
}

/// Activities of one user.
async fn user_activities(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    uri: Uri,
    user_id: Result<Path<u64>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let path = uri.path();
    let Path(user_id) = user_id.map_err(|e| ApiErrorKind::BadRequest(e.body_text()).at(path))?;
    let params = query(params, path)?;

    if !state.users.exists(user_id) {
        return Err(ApiErrorKind::UserNotFound(user_id).at(path));
    }

    Ok(page_response(state.activities.by_user(user_id), params.page, params.size))
}

/// Activities within `[startTime, endTime]`, optionally for one user.
async fn search_activities(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    uri: Uri,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let path = uri.path();
    let params = query(params, path)?;

    let start = parse_time(&params.start_time)
        .ok_or_else(|| ApiErrorKind::BadRequest(format!("Invalid startTime: {}", params.start_time)).at(path))?;
    let end = parse_time(&params.end_time)
        .ok_or_else(|| ApiErrorKind::BadRequest(format!("Invalid endTime: {}", params.end_time)).at(path))?;

    if let Some(user_id) = params.user_id {
        if !state.users.exists(user_id) {
            return Err(ApiErrorKind::UserNotFound(user_id).at(path));
        }
    }

    let matches = state.activities.search(params.user_id, start, end);
    Ok(page_response(matches, params.page, params.size))
}

/// 200 with the page, or 204 when it has no content.
fn page_response(items: Vec<ActivityResponse>, page: usize, size: usize) -> Response {
    let page = Page::of(items, page, size.clamp(1, MAX_PAGE_SIZE));
    if page.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(page).into_response()
    }
}

/// RFC 3339, or a local date-time without offset taken as UTC.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        let expected = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        assert_eq!(parse_time("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_time("2024-01-01T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_time("2024-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_time("2024-01-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn test_page_response_status() {
        assert_eq!(page_response(Vec::new(), 0, DEFAULT_PAGE_SIZE).status(), StatusCode::NO_CONTENT);
    }
}
