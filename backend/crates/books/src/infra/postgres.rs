//! PostgreSQL Repository Implementation

use crate::domain::entities::{Book, BookPatch, NewBook};
use crate::domain::repository::BookRepository;
use crate::domain::value_objects::BookFilter;
use crate::error::{BookError, BookResult};
use crate::infra::query::{BOOK_COLUMNS, build_list_query, build_update_query};
use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::BookId;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BookRepository for PgBookRepository {
    async fn insert(&self, books: &[NewBook]) -> BookResult<Vec<Book>> {
        if books.is_empty() {
            return Ok(Vec::new());
        }

        // One timestamp for the whole batch.
        let now = Utc::now();

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO books (isbn, title, author, publisher, published, genre, language, \
             pages, availability, created_at, updated_at) ",
        );
        qb.push_values(books, |mut row, book| {
            row.push_bind(book.isbn.as_str())
                .push_bind(book.title.as_str())
                .push_bind(book.author.as_str())
                .push_bind(book.publisher.as_str())
                .push_bind(book.published)
                .push_bind(book.genre.as_str())
                .push_bind(book.language.as_str())
                .push_bind(book.pages)
                .push_bind(book.availability.as_str())
                .push_bind(now)
                .push_bind(now);
        });
        qb.push(" RETURNING ").push(BOOK_COLUMNS);

        // Rolled back on drop if anything below fails.
        let mut tx = self.pool.begin().await?;
        let rows = qb
            .build_query_as::<BookRow>()
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(count = rows.len(), "Books inserted");

        rows.into_iter().map(BookRow::into_book).collect()
    }

    async fn list_by_filter(&self, filter: &BookFilter) -> BookResult<(Vec<Book>, usize)> {
        let mut qb = build_list_query(filter)?;

        let rows = qb
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        let books = rows
            .into_iter()
            .map(BookRow::into_book)
            .collect::<BookResult<Vec<_>>>()?;
        let count = books.len();
        Ok((books, count))
    }

    async fn find_by_id(&self, id: BookId) -> BookResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookRow::into_book).transpose()
    }

    async fn update(&self, id: BookId, patch: &BookPatch) -> BookResult<Book> {
        let mut qb = build_update_query(id, patch, Utc::now());

        let row = qb
            .build_query_as::<BookRow>()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.into_book(),
            None => {
                tracing::debug!(book_id = %id, "Update target not found");
                Err(BookError::NotFound(id))
            }
        }
    }

    async fn archive_by_id(&self, id: BookId) -> BookResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET deleted_at = $1, updated_at = $1
            WHERE id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id.value())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = %id, "Book archived");
        Ok(())
    }

    async fn hard_delete_by_id(&self, id: BookId) -> BookResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }
}

// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    isbn: String,
    title: String,
    author: String,
    publisher: String,
    published: NaiveDate,
    genre: String,
    language: String,
    pages: i32,
    availability: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl BookRow {
    fn into_book(self) -> BookResult<Book> {
        let availability = self.availability.parse().map_err(|_| {
            BookError::Internal(format!(
                "book {} has unknown availability {:?}",
                self.id, self.availability
            ))
        })?;

        Ok(Book {
            id: BookId::from_i64(self.id),
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            published: self.published,
            genre: self.genre,
            language: self.language,
            pages: self.pages,
            availability,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}
