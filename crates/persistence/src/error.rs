//! Persistence error types

use campus_bot_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Version conflict for {key}: expected {expected:?}, found {found:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<PersistenceError> for CoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Conflict {
                key,
                expected,
                found,
            } => CoreError::Conflict {
                key,
                expected,
                found,
            },
            PersistenceError::Serialization(e) => CoreError::Serialization(e.to_string()),
            other => CoreError::State(other.to_string()),
        }
    }
}
