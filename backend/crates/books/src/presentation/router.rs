//! Books Router

use crate::application::config::BooksConfig;
use crate::domain::repository::BookRepository;
use crate::infra::postgres::PgBookRepository;
use crate::presentation::handlers::{self, BooksAppState};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Create the books router with PostgreSQL repository
pub fn books_router(repo: PgBookRepository, config: BooksConfig) -> Router {
    books_router_generic(repo, config)
}

/// Create a generic books router for any repository implementation
pub fn books_router_generic<R>(repo: R, config: BooksConfig) -> Router
where
    R: BookRepository + Clone + Send + Sync + 'static,
{
    let state = BooksAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    Router::new()
        .route(
            "/books",
            get(handlers::list_books::<R>).post(handlers::create_books::<R>),
        )
        .route(
            "/books/{id}",
            get(handlers::get_book::<R>)
                .put(handlers::update_book::<R>)
                .delete(handlers::delete_book::<R>),
        )
        .with_state(state)
}
