//! Error types for the agent memory store

use thiserror::Error;

/// Result type alias for memory store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {

    // =============================
    // Validation Errors
    // =============================

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // =============================
    // Backend Errors
    // =============================

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for errors caused by malformed caller input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidNamespace(_) | StoreError::InvalidKey(_) | StoreError::InvalidValue(_)
        )
    }
}
