//! Error conversions
//!
//! `sqlx::Error` classification (feature `sqlx`) and the RFC 7807 response
//! (feature `axum`).

#[cfg(feature = "sqlx")]
use super::{app_error::AppError, kind::ErrorKind};

/// Classify a driver error, with the caller-safe message for it.
///
/// SQLSTATE reference: <https://www.postgresql.org/docs/current/errcodes-appendix.html>
#[cfg(feature = "sqlx")]
pub fn classify_sqlx(err: &sqlx::Error) -> (ErrorKind, &'static str) {
    match err {
        sqlx::Error::PoolTimedOut => (
            ErrorKind::ServiceUnavailable,
            "Database connection pool exhausted",
        ),
        sqlx::Error::PoolClosed => (ErrorKind::ServiceUnavailable, "Database is shutting down"),
        sqlx::Error::Io(_) => (ErrorKind::ServiceUnavailable, "Database connection error"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => (ErrorKind::Conflict, "entity already exists"),
            Some("23502") => (ErrorKind::BadRequest, "Required field is null"),
            Some("23514") => (ErrorKind::BadRequest, "Value violates a check constraint"),
            Some("22001") => (ErrorKind::BadRequest, "Value too long"),
            Some("22003") => (ErrorKind::BadRequest, "Numeric value out of range"),
            Some("22007" | "22008") => (ErrorKind::BadRequest, "Invalid date value"),
            // Class 53: insufficient resources, class 57: operator intervention
            Some(code) if code.starts_with("53") || code.starts_with("57") => {
                (ErrorKind::ServiceUnavailable, "Database unavailable")
            }
            _ => (ErrorKind::InternalServerError, "Database error"),
        },
        _ => (ErrorKind::InternalServerError, "Database error"),
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let (kind, message) = classify_sqlx(&err);
        let app_err = AppError::new(kind, message);
        let app_err = if kind == ErrorKind::ServiceUnavailable {
            app_err.with_action("Please retry the request")
        } else {
            app_err
        };
        app_err.with_source(err)
    }
}

#[cfg(feature = "axum")]
mod response {
    use super::super::app_error::AppError;
    use axum::Json;
    use axum::http::{HeaderValue, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use serde::Serialize;

    /// RFC 7807 Problem Details body
    #[derive(Serialize)]
    struct Problem<'a> {
        #[serde(rename = "type")]
        type_uri: String,
        title: &'static str,
        status: u16,
        detail: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<&'a str>,
        retryable: bool,
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            let problem = Problem {
                type_uri: format!("urn:problem:{}", self.kind().slug()),
                title: self.kind().title(),
                status: status.as_u16(),
                detail: self.message(),
                action: self.action(),
                retryable: self.is_retryable(),
            };

            let mut response = (
                status,
                [(header::CONTENT_TYPE, "application/problem+json")],
                Json(problem),
            )
                .into_response();
            if let Some(after) = self.retry_after() {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(after.as_secs()));
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "sqlx")]
    #[test]
    fn test_sqlx_classification() {
        use super::*;

        let app_err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(app_err.kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(app_err.action(), Some("Please retry the request"));

        let (kind, _) = classify_sqlx(&sqlx::Error::RowNotFound);
        assert_eq!(kind, ErrorKind::InternalServerError);

        let (kind, _) = classify_sqlx(&sqlx::Error::Protocol("bad frame".into()));
        assert_eq!(kind, ErrorKind::InternalServerError);
    }

    #[cfg(feature = "axum")]
    #[tokio::test]
    async fn test_problem_details_body() {
        use crate::error::app_error::AppError;
        use axum::http::header;
        use axum::response::IntoResponse;
        use std::time::Duration;

        let response = AppError::too_many_requests("rate limit exceeded")
            .with_retry_after(Duration::from_secs(180))
            .into_response();
        assert_eq!(response.status().as_u16(), 429);
        assert_eq!(response.headers()[header::RETRY_AFTER], "180");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["type"], "urn:problem:too-many-requests");
        assert_eq!(body["status"], 429);
        assert_eq!(body["title"], "Too Many Requests");
        assert_eq!(body["detail"], "rate limit exceeded");
        assert_eq!(body["action"], "Retry after 180 seconds");
        assert_eq!(body["retryable"], true);
    }

    #[cfg(feature = "axum")]
    #[tokio::test]
    async fn test_problem_details_omit_missing_action() {
        use crate::error::app_error::AppError;
        use axum::response::IntoResponse;

        let response = AppError::not_found("book 4 not found").into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("action").is_none());
        assert_eq!(body["retryable"], false);
    }
}
