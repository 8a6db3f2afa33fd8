//! Intent classifier adapters
//!
//! Features:
//! - Hosted prediction endpoint client (one application id per model)
//! - Bounded exponential-backoff retry on network and 5xx failures
//! - Provider factory selecting the local pattern classifier or the hosted
//!   endpoint from configuration

pub mod factory;
pub mod http;

pub use factory::ClassifierFactory;
pub use http::{HttpClassifier, HttpClassifierConfig};

use campus_bot_core::CoreError;
use thiserror::Error;

/// Classifier adapter errors
#[derive(Error, Debug)]
pub enum NluError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for NluError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NluError::Timeout
        } else {
            NluError::Network(err.to_string())
        }
    }
}

impl From<NluError> for CoreError {
    fn from(err: NluError) -> Self {
        match err {
            NluError::UnknownModel(model) => CoreError::UnknownModel(model),
            other => CoreError::Classifier(other.to_string()),
        }
    }
}

impl From<campus_bot_text_processing::TextProcessingError> for NluError {
    fn from(err: campus_bot_text_processing::TextProcessingError) -> Self {
        NluError::Configuration(err.to_string())
    }
}
