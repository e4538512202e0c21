//! HTTP Handlers

use crate::application::config::BooksConfig;
use crate::application::create_books::CreateBooksUseCase;
use crate::application::delete_book::DeleteBookUseCase;
use crate::application::get_book::GetBookUseCase;
use crate::application::list_books::ListBooksUseCase;
use crate::application::update_book::UpdateBookUseCase;
use crate::domain::repository::BookRepository;
use crate::error::{BookError, BookResult};
use crate::presentation::dto::{
    BookResponse, CreateBooksPayload, ListBooksQuery, ListBooksResponse, UpdateBookRequest,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kernel::id::BookId;
use std::sync::Arc;

/// Shared state for book handlers
#[derive(Clone)]
pub struct BooksAppState<R>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<BooksConfig>,
}

fn parse_id(raw: &str) -> BookResult<BookId> {
    raw.parse::<BookId>()
        .ok()
        .filter(|id| id.value() > 0)
        .ok_or_else(|| BookError::validation("id must be a positive integer"))
}

/// POST /books
pub async fn create_books<R>(
    State(state): State<BooksAppState<R>>,
    payload: Result<Json<CreateBooksPayload>, JsonRejection>,
) -> BookResult<(StatusCode, Json<Vec<BookResponse>>)>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let Json(payload) = payload.map_err(|e| BookError::validation(e.body_text()))?;
    let books = payload.into_new_books()?;

    let use_case = CreateBooksUseCase::new(state.repo.clone(), state.config.clone());
    let created = use_case.execute(books).await?;

    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(BookResponse::from).collect()),
    ))
}

/// GET /books
pub async fn list_books<R>(
    State(state): State<BooksAppState<R>>,
    query: Result<Query<ListBooksQuery>, QueryRejection>,
) -> BookResult<Json<ListBooksResponse>>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let Query(query) = query.map_err(|e| BookError::validation(e.body_text()))?;
    let filter = query.into_filter()?;

    let use_case = ListBooksUseCase::new(state.repo.clone());
    let output = use_case.execute(filter).await?;

    Ok(Json(ListBooksResponse {
        books: output.books.into_iter().map(BookResponse::from).collect(),
        count: output.count,
    }))
}

/// GET /books/{id}
pub async fn get_book<R>(
    State(state): State<BooksAppState<R>>,
    Path(id): Path<String>,
) -> BookResult<Json<BookResponse>>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let id = parse_id(&id)?;

    let use_case = GetBookUseCase::new(state.repo.clone());
    let book = use_case.execute(id).await?;

    Ok(Json(book.into()))
}

/// PUT /books/{id}
pub async fn update_book<R>(
    State(state): State<BooksAppState<R>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> BookResult<Json<BookResponse>>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    let Json(req) = payload.map_err(|e| BookError::validation(e.body_text()))?;
    let patch = req.into_patch()?;

    let use_case = UpdateBookUseCase::new(state.repo.clone());
    let book = use_case.execute(id, patch).await?;

    Ok(Json(book.into()))
}

/// DELETE /books/{id}
pub async fn delete_book<R>(
    State(state): State<BooksAppState<R>>,
    Path(id): Path<String>,
) -> BookResult<StatusCode>
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let id = parse_id(&id)?;

    let use_case = DeleteBookUseCase::new(state.repo.clone(), state.config.clone());
    use_case.execute(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
