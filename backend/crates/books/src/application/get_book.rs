//! Get Book Use Case

use crate::domain::entities::Book;
use crate::domain::repository::BookRepository;
use crate::error::{BookError, BookResult};
use kernel::id::BookId;
use std::sync::Arc;

pub struct GetBookUseCase<R>
where
    R: BookRepository,
{
    repo: Arc<R>,
}

impl<R> GetBookUseCase<R>
where
    R: BookRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: BookId) -> BookResult<Book> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(BookError::NotFound(id))
    }
}
