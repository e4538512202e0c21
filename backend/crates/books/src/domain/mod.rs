//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Book, NewBook, BookPatch)
//! - Domain value objects (Availability, BookFilter)
//! - Domain services (field validation)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
