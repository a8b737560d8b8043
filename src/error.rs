//! Error types for verimath
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in verimath
#[derive(Debug, Error)]
pub enum VerimathError {
    /// Pair lookup or storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Plan could not be built or parsed
    #[error("Plan error: {0}")]
    Plan(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template error
    #[error("Template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for verimath operations
pub type Result<T> = std::result::Result<T, VerimathError>;
