//! Shared Kernel - Vocabulary shared by every crate in the workspace
//!
//! This crate holds the few things whose meaning must not drift between crates:
//! - The unified error type and its HTTP classification
//! - Typed integer identifiers for persisted entities
//!
//! Anything domain specific belongs in the owning crate.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
