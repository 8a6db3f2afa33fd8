use campus_bot_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextProcessingError>;

#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Invalid pattern in {context}: {message}")]
    InvalidPattern { context: String, message: String },

    #[error("Failed to load models: {0}")]
    ModelLoad(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl From<TextProcessingError> for CoreError {
    fn from(err: TextProcessingError) -> Self {
        match err {
            TextProcessingError::UnknownModel(model) => CoreError::UnknownModel(model),
            other => CoreError::Classifier(other.to_string()),
        }
    }
}
