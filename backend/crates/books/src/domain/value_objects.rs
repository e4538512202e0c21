//! Domain Value Objects

use crate::domain::entities::Book;
use crate::error::{BookError, BookResult};
use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::BookId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lending state of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    NotAvailable,
}

impl Availability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::NotAvailable => "not_available",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "available" => Ok(Availability::Available),
            "not_available" => Ok(Availability::NotAvailable),
            other => Err(BookError::validation(format!(
                "availability must be one of available, not_available (got {other:?})"
            ))),
        }
    }
}

/// Listing query.
///
/// Every `Some` field narrows the result (AND). Text fields that are empty
/// after trimming count as absent. `page` and `per_page` of 0 disable offset
/// and limit respectively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub id: Option<BookId>,
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub availability: Option<Availability>,
    pub published: Option<NaiveDate>,
    pub pages: Option<i32>,
    /// Inclusive lower bound on `updated_at`
    pub updated_since: Option<DateTime<Utc>>,
    pub page: u32,
    pub per_page: u32,
}

/// `Some` only for non-blank text.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl BookFilter {
    /// Row limit, if any.
    pub fn limit(&self) -> Option<i64> {
        (self.per_page > 0).then(|| i64::from(self.per_page))
    }

    /// Rows to skip, if any: `(page - 1) * per_page` for `page > 0`.
    pub fn offset(&self) -> BookResult<Option<i64>> {
        if self.page == 0 {
            return Ok(None);
        }
        i64::from(self.page - 1)
            .checked_mul(i64::from(self.per_page))
            .map(Some)
            .ok_or_else(|| {
                BookError::QueryBuild(format!(
                    "offset for page {} with per_page {} is out of range",
                    self.page, self.per_page
                ))
            })
    }

    /// Predicate form of the filter, ignoring pagination.
    pub fn matches(&self, book: &Book) -> bool {
        if book.is_archived() {
            return false;
        }
        self.id.is_none_or(|id| book.id == id)
            && present(&self.isbn).is_none_or(|isbn| book.isbn == isbn)
            && present(&self.title).is_none_or(|t| contains_ci(&book.title, t))
            && present(&self.author).is_none_or(|a| contains_ci(&book.author, a))
            && present(&self.publisher).is_none_or(|p| contains_ci(&book.publisher, p))
            && present(&self.genre).is_none_or(|g| contains_ci(&book.genre, g))
            && present(&self.language).is_none_or(|l| book.language == l)
            && self.availability.is_none_or(|a| book.availability == a)
            && self.published.is_none_or(|d| book.published == d)
            && self.pages.is_none_or(|p| book.pages == p)
            && self.updated_since.is_none_or(|since| book.updated_at >= since)
    }
}
