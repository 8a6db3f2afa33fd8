//! Error types shared across adapter boundaries

use thiserror::Error;

/// Result alias using [`CoreError`]
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the external collaborators
///
/// Each adapter crate keeps its own error enum and converts into this one at
/// the trait seam, so the dispatcher only has to reason about one type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Unknown classifier model: {0}")]
    UnknownModel(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("State store error: {0}")]
    State(String),

    #[error("State version conflict for {key}: expected {expected:?}, found {found:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether the error came from one of the query services
    /// (classifier or knowledge base) rather than storage or transport.
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            Self::Classifier(_) | Self::UnknownModel(_) | Self::Knowledge(_)
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}
