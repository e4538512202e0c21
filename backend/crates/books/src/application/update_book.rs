//! Update Book Use Case

use crate::domain::entities::{Book, BookPatch};
use crate::domain::repository::BookRepository;
use crate::domain::services::validate_patch;
use crate::error::BookResult;
use kernel::id::BookId;
use std::sync::Arc;

pub struct UpdateBookUseCase<R>
where
    R: BookRepository,
{
    repo: Arc<R>,
}

impl<R> UpdateBookUseCase<R>
where
    R: BookRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// An empty patch still bumps `updated_at`.
    pub async fn execute(&self, id: BookId, patch: BookPatch) -> BookResult<Book> {
        let patch = validate_patch(patch)?;
        let book = self.repo.update(id, &patch).await?;

        tracing::info!(book_id = %id, "Book updated");

        Ok(book)
    }
}
