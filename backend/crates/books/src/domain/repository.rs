//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use crate::domain::entities::{Book, BookPatch, NewBook};
use crate::domain::value_objects::BookFilter;
use crate::error::BookResult;
use kernel::id::BookId;

/// Book repository trait
#[trait_variant::make(BookRepository: Send)]
pub trait LocalBookRepository {
    /// Insert all books atomically; returns them with assigned ids and timestamps
    async fn insert(&self, books: &[NewBook]) -> BookResult<Vec<Book>>;

    /// Live books matching the filter, plus the number of rows returned
    async fn list_by_filter(&self, filter: &BookFilter) -> BookResult<(Vec<Book>, usize)>;

    /// Live book by id
    async fn find_by_id(&self, id: BookId) -> BookResult<Option<Book>>;

    /// Apply a patch to a live book and bump `updated_at`
    async fn update(&self, id: BookId, patch: &BookPatch) -> BookResult<Book>;

    /// Mark a live book as deleted, keeping the row
    async fn archive_by_id(&self, id: BookId) -> BookResult<()>;

    /// Remove the row
    async fn hard_delete_by_id(&self, id: BookId) -> BookResult<()>;
}
