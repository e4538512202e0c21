//! Books Catalog Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, filter and patch value objects, validation, repository trait
//! - `application/` - Use cases
//! - `infra/` - PostgreSQL repository, SQL builders, in-memory repository
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Storage Model
//! - Ids are assigned by the database
//! - Archived books keep their row but are invisible to every read and update
//! - Listing is offset paginated over `updated_at, id`; rows can shift between
//!   pages when writes land between fetches

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{BooksConfig, DeleteMode};
pub use error::{BookError, BookResult};
pub use infra::memory::InMemoryBookRepository;
pub use infra::postgres::PgBookRepository;
pub use presentation::router::{books_router, books_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
