//! Campus Bot Turn Logic
//!
//! Features:
//! - Turn dispatch across the none / knowledge-base / domain-model tiers
//! - Knowledge answers with a reset directive and entity-substituted
//!   templates
//! - Slot-filling dialog engine with per-step validation, reprompts and an
//!   optional retry ceiling
//! - Per-turn context with ordered sends and cancellation
//! - `CampusBot` turn runner that loads and persists conversation and user
//!   state around each turn

pub mod bot;
pub mod context;
pub mod dialog;
pub mod dispatcher;

pub use bot::{BotConfig, CampusBot, TurnReport, FLOW_STATE_PROPERTY, SLOTS_PROPERTY};
pub use context::TurnContext;
pub use dialog::{
    CollectedSlots, DialogEngine, DialogFlowState, LastQuestion, SlotValue, StepOutcome,
    Transition, ValidationFailure,
};
pub use dispatcher::{
    select_substitution_entity, Delivery, KnowledgeAnswer, Route, TurnDispatcher,
};

use campus_bot_config::ConfigError;
use campus_bot_core::CoreError;
use campus_bot_rag::RagError;
use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// The turn was cancelled; no state was written
    #[error("Turn cancelled")]
    Cancelled,

    /// State could not be loaded or saved
    #[error("State error: {0}")]
    State(CoreError),

    /// Startup configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}

impl From<RagError> for AgentError {
    fn from(err: RagError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}
