//! Knowledge-base lookup
//!
//! Features:
//! - Local question/answer knowledge base with accent-folded token overlap
//!   scoring
//! - Hosted QnA service client (`generateAnswer`), scores normalized to [0, 1]
//! - Knowledge file loading from YAML/JSON
//! - Name-keyed registry; a missing knowledge base is a startup error

pub mod http;
pub mod knowledge_loader;
pub mod local;
pub mod registry;

pub use http::{HttpKnowledgeBase, HttpKnowledgeBaseConfig};
pub use knowledge_loader::{KnowledgeEntry, KnowledgeFile, KnowledgeLoader};
pub use local::{LocalKnowledgeBase, LocalKnowledgeConfig};
pub use registry::KnowledgeBaseRegistry;

use campus_bot_core::CoreError;
use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Connection(err.to_string())
    }
}

impl From<RagError> for CoreError {
    fn from(err: RagError) -> Self {
        CoreError::Knowledge(err.to_string())
    }
}
