//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ConfigError, DialogConfig, MessagesConfig, RoutingConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Reserved labels and markers
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Free-form messages
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Slot-filling dialog
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Intent classifier adapter
    #[serde(default)]
    pub nlu: NluConfig,

    /// Knowledge base adapter
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// State store adapter
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.routing.validate()?;
        self.messages.validate()?;
        self.dialog.validate()?;
        self.validate_nlu()?;
        self.validate_knowledge()?;
        self.validate_persistence()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }
        if self.server.turn_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "server.turn_timeout_ms",
                "Turn timeout must be positive",
            ));
        }
        Ok(())
    }

    fn validate_nlu(&self) -> Result<(), ConfigError> {
        match self.nlu.provider {
            NluProvider::Local => {
                if self.nlu.models_path.trim().is_empty() {
                    return Err(ConfigError::MissingField("nlu.models_path".to_string()));
                }
            },
            NluProvider::Http => {
                if self.nlu.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                    return Err(ConfigError::MissingField("nlu.endpoint".to_string()));
                }
                if !self.nlu.apps.contains_key(&self.routing.dispatch_model) {
                    return Err(ConfigError::invalid(
                        "nlu.apps",
                        format!(
                            "No application id for dispatch model '{}'",
                            self.routing.dispatch_model
                        ),
                    ));
                }
            },
        }
        if self.nlu.timeout_ms == 0 {
            return Err(ConfigError::invalid("nlu.timeout_ms", "Must be positive"));
        }
        Ok(())
    }

    fn validate_knowledge(&self) -> Result<(), ConfigError> {
        let knowledge = &self.knowledge;
        if !(0.0..=1.0).contains(&knowledge.min_score) {
            return Err(ConfigError::invalid(
                "knowledge.min_score",
                format!("Must be between 0.0 and 1.0, got {}", knowledge.min_score),
            ));
        }
        if knowledge.top_k == 0 {
            return Err(ConfigError::invalid("knowledge.top_k", "Must be at least 1"));
        }
        match knowledge.provider {
            KnowledgeProvider::Local => {
                if knowledge.path.trim().is_empty() {
                    return Err(ConfigError::MissingField("knowledge.path".to_string()));
                }
            },
            KnowledgeProvider::Http => {
                if knowledge.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
                    return Err(ConfigError::MissingField("knowledge.host".to_string()));
                }
                if knowledge.kb_id.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(ConfigError::MissingField("knowledge.kb_id".to_string()));
                }
            },
        }
        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        if self.persistence.provider == PersistenceProvider::File
            && self.persistence.directory.trim().is_empty()
        {
            return Err(ConfigError::MissingField(
                "persistence.directory".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for one turn; the turn is cancelled past it
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3978
}
fn default_turn_timeout_ms() -> u64 {
    15_000
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            turn_timeout_ms: default_turn_timeout_ms(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Intent classifier backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NluProvider {
    /// Regex pattern models loaded from YAML
    #[default]
    Local,
    /// Hosted prediction endpoint
    Http,
}

/// Intent classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluConfig {
    #[serde(default)]
    pub provider: NluProvider,

    /// Local models file
    #[serde(default = "default_models_path")]
    pub models_path: String,

    /// Hosted endpoint base URL (e.g. `https://westeurope.api.cognitive.microsoft.com`)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Subscription key for the hosted endpoint
    #[serde(default)]
    pub subscription_key: Option<String>,

    /// Model name → hosted application id
    #[serde(default)]
    pub apps: HashMap<String, String>,

    /// Request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries on network/5xx errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff, doubled per retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_models_path() -> String {
    "config/nlu/models.yaml".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            provider: NluProvider::Local,
            models_path: default_models_path(),
            endpoint: None,
            subscription_key: None,
            apps: HashMap::new(),
            timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Knowledge base backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeProvider {
    /// Question/answer pairs loaded from YAML or JSON
    #[default]
    Local,
    /// Hosted question-answering service
    Http,
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub provider: KnowledgeProvider,

    /// Name the knowledge base is registered under
    #[serde(default = "default_knowledge_name")]
    pub name: String,

    /// Local knowledge file
    #[serde(default = "default_knowledge_path")]
    pub path: String,

    /// Hosted service base URL
    #[serde(default)]
    pub host: Option<String>,

    /// Hosted knowledge base id
    #[serde(default)]
    pub kb_id: Option<String>,

    /// Hosted endpoint key
    #[serde(default)]
    pub endpoint_key: Option<String>,

    /// Minimum candidate score in [0, 1]
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Maximum candidates returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries on network/5xx errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_knowledge_name() -> String {
    "campus-faq".to_string()
}
fn default_knowledge_path() -> String {
    "config/knowledge/campus.yaml".to_string()
}
fn default_min_score() -> f32 {
    0.3
}
fn default_top_k() -> usize {
    3
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            provider: KnowledgeProvider::Local,
            name: default_knowledge_name(),
            path: default_knowledge_path(),
            host: None,
            kb_id: None,
            endpoint_key: None,
            min_score: default_min_score(),
            top_k: default_top_k(),
            timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// State store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceProvider {
    /// Process memory (lost on restart)
    #[default]
    Memory,
    /// One JSON file per record
    File,
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub provider: PersistenceProvider,

    /// Root directory for the file store
    #[serde(default = "default_state_directory")]
    pub directory: String,
}

fn default_state_directory() -> String {
    "data/state".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            provider: PersistenceProvider::Memory,
            directory: default_state_directory(),
        }
    }
}

/// Load settings from files and environment
///
/// Layering, later wins: `config/default.*`, `config/{env}.*`, then
/// `CAMPUS_BOT__SECTION__KEY` environment variables.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("CAMPUS_BOT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        nlu = ?settings.nlu.provider,
        knowledge = ?settings.knowledge.provider,
        persistence = ?settings.persistence.provider,
        "Settings loaded"
    );

    Ok(settings)
}
