//! Error types for csvblend
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BlendError
pub type Result<T> = std::result::Result<T, BlendError>;

/// Unified error type for csvblend operations
#[derive(Debug, Error)]
pub enum BlendError {
    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("SQLite 3.24.0 (2018-06-04) or later is required (found {found})")]
    Precondition { found: String },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Operation on closed merge engine")]
    Closed,

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Schema mismatch: input is missing declared columns {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error("Input error: {0}")]
    Input(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
