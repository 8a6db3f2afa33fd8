//! Configuration management for the campus bot
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, then `config/{env}.yaml`)
//! - Environment variables (CAMPUS_BOT_ prefix, `__` section separator)
//!
//! Sections:
//! - `server`, `observability` - process surface
//! - `routing` - reserved intent labels, model names, control marker
//! - `messages` - localized free-form strings
//! - `dialog` - ordered slot-filling steps and retry policy
//! - `nlu`, `knowledge`, `persistence` - adapter selection

pub mod dialog;
pub mod messages;
pub mod routing;
pub mod settings;

pub use dialog::{ChoiceOption, DialogConfig, DialogStepConfig, ValidatorConfig};
pub use messages::{render_template, MessagesConfig};
pub use routing::RoutingConfig;
pub use settings::{
    load_settings, KnowledgeConfig, KnowledgeProvider, NluConfig, NluProvider,
    ObservabilityConfig, PersistenceConfig, PersistenceProvider, RuntimeEnvironment,
    ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
