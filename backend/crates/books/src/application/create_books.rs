//! Create Books Use Case

use crate::application::config::BooksConfig;
use crate::domain::entities::{Book, NewBook};
use crate::domain::repository::BookRepository;
use crate::domain::services::validate_new_book;
use crate::error::{BookError, BookResult};
use std::collections::HashSet;
use std::sync::Arc;

pub struct CreateBooksUseCase<R>
where
    R: BookRepository,
{
    repo: Arc<R>,
    config: Arc<BooksConfig>,
}

impl<R> CreateBooksUseCase<R>
where
    R: BookRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<BooksConfig>) -> Self {
        Self { repo, config }
    }

    /// Validate every book, then insert the whole batch or nothing.
    pub async fn execute(&self, books: Vec<NewBook>) -> BookResult<Vec<Book>> {
        if books.is_empty() {
            return Err(BookError::validation("at least one book is required"));
        }
        if books.len() > self.config.max_batch_size {
            return Err(BookError::validation(format!(
                "at most {} books can be created per request",
                self.config.max_batch_size
            )));
        }

        let books = books
            .into_iter()
            .map(validate_new_book)
            .collect::<BookResult<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(books.len());
        if !books.iter().all(|book| seen.insert(book.isbn.as_str())) {
            return Err(BookError::AlreadyExists);
        }

        let created = self.repo.insert(&books).await?;

        tracing::info!(
            count = created.len(),
            first_id = ?created.first().map(|book| book.id),
            "Created books"
        );

        Ok(created)
    }
}
