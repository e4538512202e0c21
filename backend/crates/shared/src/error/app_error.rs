//! Application Error
//!
//! [`AppError`] is what crosses crate boundaries and becomes the HTTP response.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use super::kind::ErrorKind;

type Message = Cow<'static, str>;

/// Unified error returned by handlers and middleware.
///
/// `message` is shown to the caller. `source` is kept for logs only.
///
/// ```rust
/// use std::time::Duration;
/// use kernel::error::app_error::AppError;
///
/// let err = AppError::too_many_requests("rate limit exceeded")
///     .with_retry_after(Duration::from_secs(180));
/// assert_eq!(err.retry_after(), Some(Duration::from_secs(180)));
/// ```
pub struct AppError {
    kind: ErrorKind,
    message: Message,
    action: Option<Message>,
    retry_after: Option<Duration>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<Message>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn too_many_requests(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    pub fn internal(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    pub fn service_unavailable(message: impl Into<Message>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Hint on what the caller should do next.
    pub fn with_action(mut self, action: impl Into<Message>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sent as the `Retry-After` header, in whole seconds.
    pub fn with_retry_after(mut self, after: Duration) -> Self {
        self.retry_after = Some(after);
        if self.action.is_none() {
            self.action = Some(format!("Retry after {} seconds", after.as_secs()).into());
        }
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("action", &self.action)
            .field("retry_after", &self.retry_after)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}
