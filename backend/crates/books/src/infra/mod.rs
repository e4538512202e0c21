//! Infrastructure Layer
//!
//! Repository implementations and SQL construction.

pub mod memory;
pub mod postgres;
pub mod query;
