//! Domain Entities
//!
//! Core business entities for the books catalog.

use crate::domain::value_objects::Availability;
use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::BookId;

/// Book entity - a persisted catalog record
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published: NaiveDate,
    pub genre: String,
    pub language: String,
    pub pages: i32,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the book is archived
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A book to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published: NaiveDate,
    pub genre: String,
    pub language: String,
    pub pages: i32,
    pub availability: Availability,
}

impl NewBook {
    /// Materialize as a stored book with the given id and timestamps.
    pub fn into_book(self, id: BookId, now: DateTime<Utc>) -> Book {
        Book {
            id,
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            published: self.published,
            genre: self.genre,
            language: self.language,
            pages: self.pages,
            availability: self.availability,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published: Option<NaiveDate>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i32>,
    pub availability: Option<Availability>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply present fields and bump `updated_at`.
    pub fn apply_to(&self, book: &mut Book, now: DateTime<Utc>) {
        if let Some(isbn) = &self.isbn {
            book.isbn.clone_from(isbn);
        }
        if let Some(title) = &self.title {
            book.title.clone_from(title);
        }
        if let Some(author) = &self.author {
            book.author.clone_from(author);
        }
        if let Some(publisher) = &self.publisher {
            book.publisher.clone_from(publisher);
        }
        if let Some(published) = self.published {
            book.published = published;
        }
        if let Some(genre) = &self.genre {
            book.genre.clone_from(genre);
        }
        if let Some(language) = &self.language {
            book.language.clone_from(language);
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(availability) = self.availability {
            book.availability = availability;
        }
        book.updated_at = now;
    }
}
