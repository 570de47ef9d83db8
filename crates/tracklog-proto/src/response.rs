//! Error body returned by every HTTP failure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp layout of [`ErrorResponse::timestamp`], millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// `{message, error, status, timestamp, path, errors?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable explanation.
    pub message: String,
    /// Short error category.
    pub error: String,
    /// HTTP status code.
    pub status: u16,
    /// When the error was produced.
    pub timestamp: String,
    /// Request path that failed.
    pub path: String,
    /// Expiry details or per-field validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Value>>,
}

impl ErrorResponse {
    pub fn new(
        status: u16,
        error: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            message: message.into(),
            error: error.into(),
            status,
            timestamp: format_timestamp(now),
            path: path.into(),
            errors: None,
        }
    }

    /// Attach an `errors` map.
    pub fn with_errors(mut self, errors: BTreeMap<String, Value>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attach field validation messages.
    pub fn with_field_errors(self, fields: BTreeMap<String, String>) -> Self {
        let errors = fields
            .into_iter()
            .map(|(field, message)| (field, Value::String(message)))
            .collect();
        self.with_errors(errors)
    }

    /// Attach `{expiredAt, currentTime, difference}` for an expired token.
    pub fn with_expiry(self, expired_at: DateTime<Utc>, current_time: DateTime<Utc>) -> Self {
        let difference = (current_time - expired_at).num_milliseconds();
        let mut errors = BTreeMap::new();
        errors.insert(
            "expiredAt".to_string(),
            Value::String(format_timestamp(expired_at)),
        );
        errors.insert(
            "currentTime".to_string(),
            Value::String(format_timestamp(current_time)),
        );
        errors.insert(
            "difference".to_string(),
            Value::String(format!("{} milliseconds", difference)),
        );
        self.with_errors(errors)
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(format_timestamp(at), "2024-03-01T12:30:05.042");
    }

    #[test]
    fn test_errors_omitted_when_absent() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let body = ErrorResponse::new(401, "Unauthorized", "Invalid authentication token", "/api/activities", now);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["status"], 401);
        assert_eq!(json["path"], "/api/activities");
    }

    #[test]
    fn test_expiry_details() {
        let expired_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let now = expired_at + chrono::Duration::milliseconds(500);
        let body = ErrorResponse::new(401, "Token expired", "expired", "/x", now)
            .with_expiry(expired_at, now);

        let errors = body.errors.unwrap();
        assert_eq!(errors["expiredAt"], "2024-01-01T00:00:01.000");
        assert_eq!(errors["currentTime"], "2024-01-01T00:00:01.500");
        assert_eq!(errors["difference"], "500 milliseconds");
    }
}
