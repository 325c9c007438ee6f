//! Error types shared across Blotter crates

use thiserror::Error;

/// Result type alias for Blotter operations
pub type Result<T> = std::result::Result<T, BlotterError>;

/// Main error type for Blotter
#[derive(Error, Debug)]
pub enum BlotterError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}
