//! Knowledge base registry
//!
//! Knowledge bases are registered by name; the bot resolves the one it needs
//! once, at construction, and refuses to start if it is missing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use campus_bot_config::{KnowledgeConfig, KnowledgeProvider};
use campus_bot_core::KnowledgeBase;

use crate::http::{HttpKnowledgeBase, HttpKnowledgeBaseConfig};
use crate::knowledge_loader::KnowledgeLoader;
use crate::local::{LocalKnowledgeBase, LocalKnowledgeConfig};
use crate::RagError;

/// Name-keyed set of knowledge bases
#[derive(Default)]
pub struct KnowledgeBaseRegistry {
    bases: RwLock<HashMap<String, Arc<dyn KnowledgeBase>>>,
}

impl KnowledgeBaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding the knowledge base described by `config`
    pub fn from_settings(config: &KnowledgeConfig) -> Result<Self, RagError> {
        let registry = Self::new();
        registry.register(Self::create(config)?);
        Ok(registry)
    }

    /// Create the knowledge base selected by `config.provider`
    pub fn create(config: &KnowledgeConfig) -> Result<Arc<dyn KnowledgeBase>, RagError> {
        let base: Arc<dyn KnowledgeBase> = match config.provider {
            KnowledgeProvider::Local => {
                let entries = KnowledgeLoader::load_path(Path::new(&config.path))?;
                let local = LocalKnowledgeBase::new(
                    LocalKnowledgeConfig {
                        name: config.name.clone(),
                        min_score: config.min_score,
                        top_k: config.top_k,
                    },
                    entries,
                );
                tracing::info!(
                    name = %config.name,
                    entries = local.len(),
                    "Local knowledge base ready"
                );
                Arc::new(local)
            },
            KnowledgeProvider::Http => {
                let http = HttpKnowledgeBase::new(HttpKnowledgeBaseConfig::from_settings(config)?)?;
                tracing::info!(name = %config.name, "Hosted knowledge base ready");
                Arc::new(http)
            },
        };
        Ok(base)
    }

    /// Register (or replace) a knowledge base under its own name
    pub fn register(&self, base: Arc<dyn KnowledgeBase>) {
        let name = base.name().to_string();
        if self.bases.write().insert(name.clone(), base).is_some() {
            tracing::warn!(name = %name, "Replaced registered knowledge base");
        }
    }

    /// Look up a knowledge base
    pub fn get(&self, name: &str) -> Option<Arc<dyn KnowledgeBase>> {
        self.bases.read().get(name).cloned()
    }

    /// Look up a knowledge base that must exist
    pub fn require(&self, name: &str) -> Result<Arc<dyn KnowledgeBase>, RagError> {
        self.get(name).ok_or_else(|| {
            RagError::NotFound(format!("No knowledge base registered under '{}'", name))
        })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bases.read().keys().cloned().collect();
        names.sort();
        names
    }
}
