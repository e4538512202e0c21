//! Delete Book Use Case

use crate::application::config::{BooksConfig, DeleteMode};
use crate::domain::repository::BookRepository;
use crate::error::BookResult;
use kernel::id::BookId;
use std::sync::Arc;

pub struct DeleteBookUseCase<R>
where
    R: BookRepository,
{
    repo: Arc<R>,
    config: Arc<BooksConfig>,
}

impl<R> DeleteBookUseCase<R>
where
    R: BookRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<BooksConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, id: BookId) -> BookResult<()> {
        match self.config.delete_mode {
            DeleteMode::Hard => self.repo.hard_delete_by_id(id).await?,
            DeleteMode::Archive => self.repo.archive_by_id(id).await?,
        }

        tracing::info!(book_id = %id, mode = ?self.config.delete_mode, "Book deleted");
        Ok(())
    }
}
