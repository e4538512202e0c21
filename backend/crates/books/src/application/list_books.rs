//! List Books Use Case

use crate::domain::entities::Book;
use crate::domain::repository::BookRepository;
use crate::domain::value_objects::BookFilter;
use crate::error::BookResult;
use std::sync::Arc;

/// Output DTO for list books
#[derive(Debug, Clone)]
pub struct ListBooksOutput {
    pub books: Vec<Book>,
    /// Rows in this page, not the total number of matches
    pub count: usize,
}

pub struct ListBooksUseCase<R>
where
    R: BookRepository,
{
    repo: Arc<R>,
}

impl<R> ListBooksUseCase<R>
where
    R: BookRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, filter: BookFilter) -> BookResult<ListBooksOutput> {
        let (books, count) = self.repo.list_by_filter(&filter).await?;

        tracing::debug!(
            count = count,
            page = filter.page,
            per_page = filter.per_page,
            "Listed books"
        );

        Ok(ListBooksOutput { books, count })
    }
}
