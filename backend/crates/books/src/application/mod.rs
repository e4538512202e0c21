//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations.

pub mod config;
pub mod create_books;
pub mod delete_book;
pub mod get_book;
pub mod list_books;
pub mod update_book;
