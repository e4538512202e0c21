//! In-Memory Repository
//!
//! Process-local implementation of [`BookRepository`] with the same filter,
//! ordering, uniqueness and archive semantics as the PostgreSQL one. Used by
//! tests and for running the API without a database.

use crate::domain::entities::{Book, BookPatch, NewBook};
use crate::domain::repository::BookRepository;
use crate::domain::value_objects::BookFilter;
use crate::error::{BookError, BookResult};
use chrono::Utc;
use kernel::id::BookId;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    last_id: i64,
    rows: BTreeMap<BookId, Book>,
}

impl Store {
    fn live_isbn_taken(&self, isbn: &str, except: Option<BookId>) -> bool {
        self.rows
            .values()
            .any(|book| !book.is_archived() && book.isbn == isbn && Some(book.id) != except)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBookRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored row regardless of archive state.
    pub async fn raw(&self, id: BookId) -> Option<Book> {
        self.store.read().await.rows.get(&id).cloned()
    }
}

impl BookRepository for InMemoryBookRepository {
    async fn insert(&self, books: &[NewBook]) -> BookResult<Vec<Book>> {
        let mut store = self.store.write().await;

        // Check the whole batch before writing anything.
        let mut batch = HashSet::with_capacity(books.len());
        let duplicate = books.iter().any(|book| {
            !batch.insert(book.isbn.as_str()) || store.live_isbn_taken(&book.isbn, None)
        });
        if duplicate {
            return Err(BookError::AlreadyExists);
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(books.len());
        for book in books {
            store.last_id += 1;
            let id = BookId::from_i64(store.last_id);
            let book = book.clone().into_book(id, now);
            store.rows.insert(id, book.clone());
            created.push(book);
        }
        Ok(created)
    }

    async fn list_by_filter(&self, filter: &BookFilter) -> BookResult<(Vec<Book>, usize)> {
        let offset = filter.offset()?.unwrap_or(0);
        let limit = filter.limit();

        let store = self.store.read().await;
        let mut matched: Vec<Book> = store
            .rows
            .values()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect();
        matched.sort_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)));

        let books: Vec<Book> = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX)))
            .collect();
        let count = books.len();
        Ok((books, count))
    }

    async fn find_by_id(&self, id: BookId) -> BookResult<Option<Book>> {
        let store = self.store.read().await;
        Ok(store.rows.get(&id).filter(|book| !book.is_archived()).cloned())
    }

    async fn update(&self, id: BookId, patch: &BookPatch) -> BookResult<Book> {
        let mut store = self.store.write().await;

        if !store.rows.get(&id).is_some_and(|book| !book.is_archived()) {
            return Err(BookError::NotFound(id));
        }
        if let Some(isbn) = &patch.isbn {
            if store.live_isbn_taken(isbn, Some(id)) {
                return Err(BookError::AlreadyExists);
            }
        }

        let book = store
            .rows
            .get_mut(&id)
            .ok_or(BookError::NotFound(id))?;
        patch.apply_to(book, Utc::now());
        Ok(book.clone())
    }

    async fn archive_by_id(&self, id: BookId) -> BookResult<()> {
        let mut store = self.store.write().await;
        match store.rows.get_mut(&id) {
            Some(book) if !book.is_archived() => {
                let now = Utc::now();
                book.deleted_at = Some(now);
                book.updated_at = now;
                Ok(())
            }
            _ => Err(BookError::NotFound(id)),
        }
    }

    async fn hard_delete_by_id(&self, id: BookId) -> BookResult<()> {
        let mut store = self.store.write().await;
        store
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(BookError::NotFound(id))
    }
}
