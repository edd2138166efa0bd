//! Error types for the Hearth core library.

use thiserror::Error;

/// Top-level error type for all Hearth storage and configuration operations.
#[derive(Error, Debug)]
pub enum HearthError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A character id that cannot be used as a storage key.
    #[error("Invalid character id: {0:?}")]
    InvalidCharacterId(String),

    /// No entry of the required kind at the given position.
    #[error("No dialogue turn at index {index} for character {character}")]
    EntryNotFound {
        /// Character whose log was addressed.
        character: String,
        /// Position that was requested.
        index: usize,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for HearthError {
    fn from(err: serde_json::Error) -> Self {
        HearthError::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HearthError>;
