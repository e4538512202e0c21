//! Error Kind
//!
//! The closed set of outcomes an API call can fail with.

use std::fmt;

/// HTTP-facing error classification.
///
/// Crate-local error enums pick one of these; the HTTP layer only ever sees
/// the kind, never the crate error.
///
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// assert_eq!(ErrorKind::TooManyRequests.status_code(), 429);
/// assert_eq!(ErrorKind::TooManyRequests.slug(), "too-many-requests");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed or invalid input
    BadRequest,
    /// No live resource at this address
    NotFound,
    /// ISBN already taken by a live book
    Conflict,
    /// Client spent its quota for the current window
    TooManyRequests,
    InternalServerError,
    /// Database or cache temporarily unreachable
    ServiceUnavailable,
}

impl ErrorKind {
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::TooManyRequests => 429,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase, used as the problem `title`.
    pub const fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::TooManyRequests => "Too Many Requests",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Stable kebab-case identifier, used in the problem `type`.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::TooManyRequests => "too-many-requests",
            Self::InternalServerError => "internal",
            Self::ServiceUnavailable => "unavailable",
        }
    }

    pub const fn is_server_error(self) -> bool {
        self.status_code() >= 500
    }

    /// The identical request may succeed later.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TooManyRequests | Self::ServiceUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 6] = [
        ErrorKind::BadRequest,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::TooManyRequests,
        ErrorKind::InternalServerError,
        ErrorKind::ServiceUnavailable,
    ];

    #[test]
    fn test_status_codes() {
        let codes: Vec<u16> = ALL.iter().map(|k| k.status_code()).collect();
        assert_eq!(codes, [400, 404, 409, 429, 500, 503]);
    }

    #[test]
    fn test_slugs_are_unique() {
        let mut slugs: Vec<&str> = ALL.iter().map(|k| k.slug()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), ALL.len());
    }

    #[test]
    fn test_retryable_kinds() {
        let retryable: Vec<ErrorKind> = ALL.into_iter().filter(|k| k.is_retryable()).collect();
        assert_eq!(
            retryable,
            [ErrorKind::TooManyRequests, ErrorKind::ServiceUnavailable]
        );
        assert!(ErrorKind::ServiceUnavailable.is_server_error());
        assert!(!ErrorKind::TooManyRequests.is_server_error());
    }
}
