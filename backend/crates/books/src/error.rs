//! Book Error Types
//!
//! Book-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::conversions::classify_sqlx;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use kernel::id::BookId;
use thiserror::Error;

/// Book-specific result type alias
pub type BookResult<T> = Result<T, BookError>;

#[derive(Debug, Error)]
pub enum BookError {
    /// Malformed or invalid input; the message is shown to the caller
    #[error("{0}")]
    Validation(String),

    /// No live (non-archived) book with this id
    #[error("book {0} not found")]
    NotFound(BookId),

    /// Unique ISBN violated among live books
    #[error("entity already exists")]
    AlreadyExists,

    /// The listing query could not be assembled from the filter
    #[error("invalid query: {0}")]
    QueryBuild(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for BookError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation =
            matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if unique_violation {
            BookError::AlreadyExists
        } else {
            BookError::Database(err)
        }
    }
}

impl BookError {
    pub fn validation(message: impl Into<String>) -> Self {
        BookError::Validation(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookError::Validation(_) | BookError::QueryBuild(_) => ErrorKind::BadRequest,
            BookError::NotFound(_) => ErrorKind::NotFound,
            BookError::AlreadyExists => ErrorKind::Conflict,
            BookError::Database(e) => classify_sqlx(e).0,
            BookError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            BookError::Database(e) => {
                tracing::error!(error = %e, "Books database error");
            }
            BookError::Internal(msg) => {
                tracing::error!(message = %msg, "Books internal error");
            }
            BookError::AlreadyExists => {
                tracing::warn!("Duplicate book rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Books request error");
            }
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            // Keeps the driver error as the source without exposing it.
            BookError::Database(e) => AppError::from(e),
            BookError::Internal(msg) => {
                AppError::internal("Internal error").with_source(std::io::Error::other(msg))
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}

impl IntoResponse for BookError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}
