//! Application Configuration
//!
//! Configuration for the books application layer.

use std::str::FromStr;

/// What `DELETE /books/{id}` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Remove the row
    #[default]
    Hard,
    /// Set `deleted_at` and keep the row
    Archive,
}

impl FromStr for DeleteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" | "delete" => Ok(DeleteMode::Hard),
            "archive" | "soft" => Ok(DeleteMode::Archive),
            other => Err(format!("unknown delete mode: {other}")),
        }
    }
}

/// Books application configuration
#[derive(Debug, Clone)]
pub struct BooksConfig {
    pub delete_mode: DeleteMode,
    /// Largest batch accepted by one create request
    pub max_batch_size: usize,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            delete_mode: DeleteMode::Hard,
            max_batch_size: 500,
        }
    }
}

impl BooksConfig {
    pub fn with_delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }
}
