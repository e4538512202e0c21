//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client identity derivation from peer addresses
//! - Counter cache abstraction with Redis and in-memory backends
//! - Fixed-window rate limiting and its axum middleware

pub mod cache;
pub mod client;
pub mod middleware;
pub mod rate_limit;
