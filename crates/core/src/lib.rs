//! Core traits and types for the campus bot
//!
//! This crate provides the foundational types used across all other crates:
//! - Channel activities (inbound messages and conversation events)
//! - Classification results (ranked intents and extracted entities)
//! - Knowledge-base answer candidates
//! - State scopes and versioned state records
//! - Adapter traits for the external collaborators (classifier,
//!   knowledge base, state store, outbound messages)
//! - Error types

pub mod activity;
pub mod error;
pub mod knowledge;
pub mod recognition;
pub mod state;
pub mod traits;

pub use activity::{Activity, ActivityKind, ChannelAccount, ConversationAccount};
pub use error::{CoreError, Result};
pub use knowledge::AnswerCandidate;
pub use recognition::{ClassificationResult, Entity, IntentScore};
pub use state::{StateKey, StateScope, StoredRecord};

// Trait re-exports
pub use traits::{
    CollectingSink, IntentClassifier, KnowledgeBase, MessageSink, StateStore,
};
