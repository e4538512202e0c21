//! API DTOs (Data Transfer Objects)
//!
//! Wire conventions kept for existing clients:
//! - `published` and `updated_at` inputs are unix timestamps in seconds
//! - on update and in listing queries an empty string or `0` means "not set"

use crate::domain::entities::{Book, BookPatch, NewBook};
use crate::domain::services::normalize_isbn;
use crate::domain::value_objects::{Availability, BookFilter};
use crate::error::{BookError, BookResult};
use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::BookId;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_zero<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

fn unix_to_datetime(field: &str, secs: i64) -> BookResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| BookError::validation(format!("{field} must be a unix timestamp")))
}

fn unix_to_date(field: &str, secs: i64) -> BookResult<NaiveDate> {
    unix_to_datetime(field, secs).map(|dt| dt.date_naive())
}

fn parse_availability(value: Option<String>) -> BookResult<Option<Availability>> {
    non_blank(value).map(|v| v.parse()).transpose()
}

/// Request body item for POST /books
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookRequest {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// Unix timestamp (seconds)
    pub published: Option<i64>,
    pub genre: String,
    pub language: String,
    pub pages: Option<i32>,
    /// Defaults to `available`
    pub availability: Option<String>,
}

impl CreateBookRequest {
    pub fn into_new_book(self) -> BookResult<NewBook> {
        let published = self
            .published
            .ok_or_else(|| BookError::validation("published field is required"))?;
        let pages = self
            .pages
            .ok_or_else(|| BookError::validation("pages field is required"))?;

        Ok(NewBook {
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            published: unix_to_date("published", published)?,
            genre: self.genre,
            language: self.language,
            pages,
            availability: parse_availability(self.availability)?.unwrap_or_default(),
        })
    }
}

/// POST /books accepts one book or an array of books.
#[derive(Debug, Clone)]
pub enum CreateBooksPayload {
    Many(Vec<CreateBookRequest>),
    One(CreateBookRequest),
}

/// Dispatches on the JSON shape so field errors keep their path.
impl<'de> Deserialize<'de> for CreateBooksPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = CreateBooksPayload;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a book object or an array of books")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                Vec::deserialize(SeqAccessDeserializer::new(seq)).map(CreateBooksPayload::Many)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                CreateBookRequest::deserialize(MapAccessDeserializer::new(map))
                    .map(CreateBooksPayload::One)
            }
        }

        deserializer.deserialize_any(PayloadVisitor)
    }
}

impl CreateBooksPayload {
    pub fn into_new_books(self) -> BookResult<Vec<NewBook>> {
        match self {
            CreateBooksPayload::One(book) => Ok(vec![book.into_new_book()?]),
            CreateBooksPayload::Many(books) => books
                .into_iter()
                .map(CreateBookRequest::into_new_book)
                .collect(),
        }
    }
}

/// Request body for PUT /books/{id}
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBookRequest {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published: Option<i64>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i32>,
    pub availability: Option<String>,
}

impl UpdateBookRequest {
    pub fn into_patch(self) -> BookResult<BookPatch> {
        Ok(BookPatch {
            isbn: non_blank(self.isbn),
            title: non_blank(self.title),
            author: non_blank(self.author),
            publisher: non_blank(self.publisher),
            published: non_zero(self.published)
                .map(|secs| unix_to_date("published", secs))
                .transpose()?,
            genre: non_blank(self.genre),
            language: non_blank(self.language),
            pages: non_zero(self.pages),
            availability: parse_availability(self.availability)?,
        })
    }
}

/// Query string for GET /books
///
/// Kept as raw strings so that malformed numbers produce a field-specific 400.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListBooksQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    /// Unix timestamp (seconds); inclusive lower bound
    pub updated_at: Option<String>,
    pub id: Option<String>,
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub availability: Option<String>,
    /// Unix timestamp (seconds); matched by UTC date
    pub published: Option<String>,
    pub book_pages: Option<String>,
}

fn parse_number<T: FromStr>(field: &str, value: Option<String>) -> BookResult<Option<T>> {
    non_blank(value)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| BookError::validation(format!("{field} must be a valid integer")))
        })
        .transpose()
}

impl ListBooksQuery {
    pub fn into_filter(self) -> BookResult<BookFilter> {
        let updated_since = non_zero(parse_number::<i64>("updated_at", self.updated_at)?)
            .map(|secs| unix_to_datetime("updated_at", secs))
            .transpose()?;
        let published = non_zero(parse_number::<i64>("published", self.published)?)
            .map(|secs| unix_to_date("published", secs))
            .transpose()?;

        Ok(BookFilter {
            id: non_zero(parse_number::<i64>("id", self.id)?).map(BookId::from_i64),
            isbn: non_blank(self.isbn).map(|isbn| normalize_isbn(&isbn).unwrap_or(isbn)),
            title: non_blank(self.title),
            author: non_blank(self.author),
            publisher: non_blank(self.publisher),
            genre: non_blank(self.genre),
            language: non_blank(self.language),
            availability: parse_availability(self.availability)?,
            published,
            pages: non_zero(parse_number::<i32>("book_pages", self.book_pages)?),
            updated_since,
            page: parse_number::<u32>("page", self.page)?.unwrap_or(0),
            per_page: parse_number::<u32>("per_page", self.per_page)?.unwrap_or(0),
        })
    }
}

/// A book as returned by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// `YYYY-MM-DD`
    pub published: NaiveDate,
    pub genre: String,
    pub language: String,
    pub pages: i32,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            isbn: book.isbn,
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            published: book.published,
            genre: book.genre,
            language: book.language,
            pages: book.pages,
            availability: book.availability,
            created_at: book.created_at,
            updated_at: book.updated_at,
            deleted_at: book.deleted_at,
        }
    }
}

/// Response for GET /books
#[derive(Debug, Clone, Serialize)]
pub struct ListBooksResponse {
    pub books: Vec<BookResponse>,
    /// Number of books in this response
    pub count: usize,
}
