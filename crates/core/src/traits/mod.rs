//! Adapter traits for the external collaborators
//!
//! The turn logic only ever talks to these seams, so every backend can be
//! swapped from configuration and replaced by an in-memory mock in tests.
//!
//! # Trait Overview
//!
//! ```text
//! Understanding:
//!   - IntentClassifier: (model, utterance) → ranked intents + entities
//!
//! Retrieval:
//!   - KnowledgeBase: question → scored answer candidates
//!
//! Storage:
//!   - StateStore: versioned (scope, key) → JSON record
//!
//! Output:
//!   - MessageSink: ordered outbound text for the current turn
//! ```

mod classifier;
mod knowledge;
mod sink;
mod state_store;

pub use classifier::IntentClassifier;
pub use knowledge::KnowledgeBase;
pub use sink::{CollectingSink, MessageSink};
pub use state_store::StateStore;
