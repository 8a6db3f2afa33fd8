//! Pattern-based intent classification
//!
//! A small, config-driven stand-in for a hosted intent-recognition service.
//! Each named model declares intents as regex patterns plus entity
//! extractors; the classifier serves any number of models behind the
//! `IntentClassifier` seam.
//!
//! # Features
//!
//! - Models loaded from YAML or JSON (`config/nlu/models.yaml`)
//! - Intent patterns match folded text (lowercase, accents stripped), so
//!   they are written without accents
//! - Entity extractors match the original text; capture group 1 is the
//!   entity span when present
//! - Unmatched input yields the model's fallback intent with score 1.0
//!
//! # Example
//!
//! ```yaml
//! version: "1.0"
//! models:
//!   - name: Dispatch
//!     fallback_intent: None
//!     intents:
//!       - name: QnA
//!         patterns: ["\\bhorario", "\\bbiblioteca"]
//!       - name: Campus_info
//!         score: 0.8
//!         patterns: ["\\bcampus\\b", "\\bsede\\b"]
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use campus_bot_core::{ClassificationResult, CoreError, Entity, IntentClassifier, IntentScore};

use crate::fold::fold;
use crate::{Result, TextProcessingError};

/// Models file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternModelsFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// Model definitions
    pub models: Vec<PatternModelConfig>,
}

/// One named model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternModelConfig {
    pub name: String,
    /// Intent returned when no pattern matches
    #[serde(default = "default_fallback_intent")]
    pub fallback_intent: String,
    #[serde(default)]
    pub intents: Vec<PatternIntentConfig>,
    #[serde(default)]
    pub entities: Vec<EntityPatternConfig>,
}

fn default_fallback_intent() -> String {
    "None".to_string()
}

/// One intent and the patterns that trigger it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternIntentConfig {
    pub name: String,
    /// Score reported when any pattern matches
    #[serde(default = "default_intent_score")]
    pub score: f32,
    pub patterns: Vec<String>,
}

fn default_intent_score() -> f32 {
    0.9
}

/// Entity extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPatternConfig {
    pub entity_type: String,
    pub pattern: String,
}

struct CompiledIntent {
    name: String,
    score: f32,
    patterns: Vec<Regex>,
}

struct CompiledModel {
    fallback_intent: String,
    intents: Vec<CompiledIntent>,
    entities: Vec<(String, Regex)>,
}

fn compile(pattern: &str, context: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", pattern)).map_err(|e| TextProcessingError::InvalidPattern {
        context: context.to_string(),
        message: e.to_string(),
    })
}

impl CompiledModel {
    fn from_config(config: &PatternModelConfig) -> Result<Self> {
        let intents = config
            .intents
            .iter()
            .map(|intent| {
                let context = format!("{}/{}", config.name, intent.name);
                let patterns = intent
                    .patterns
                    .iter()
                    .map(|p| compile(p, &context))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledIntent {
                    name: intent.name.clone(),
                    score: intent.score.clamp(0.0, 1.0),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let entities = config
            .entities
            .iter()
            .map(|e| {
                let context = format!("{}/entity:{}", config.name, e.entity_type);
                Ok((e.entity_type.clone(), compile(&e.pattern, &context)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fallback_intent: config.fallback_intent.clone(),
            intents,
            entities,
        })
    }

    fn classify(&self, utterance: &str) -> ClassificationResult {
        let folded = fold(utterance);

        let mut intents: Vec<IntentScore> = self
            .intents
            .iter()
            .filter(|intent| intent.patterns.iter().any(|p| p.is_match(&folded)))
            .map(|intent| IntentScore::new(intent.name.clone(), intent.score))
            .collect();

        // Stable sort keeps declaration order on ties
        intents.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if intents.is_empty() {
            intents.push(IntentScore::new(self.fallback_intent.clone(), 1.0));
        }

        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .flat_map(|(entity_type, regex)| {
                regex.captures_iter(utterance).filter_map(move |caps| {
                    let span = caps.get(1).or_else(|| caps.get(0))?;
                    Some(Entity {
                        entity_type: entity_type.clone(),
                        text: span.as_str().to_string(),
                        start: span.start(),
                        end: span.end(),
                    })
                })
            })
            .collect();
        entities.sort_by_key(|e| e.start);

        ClassificationResult::new(utterance, intents).with_entities(entities)
    }
}

/// Regex-driven classifier serving several named models
pub struct PatternClassifier {
    models: RwLock<HashMap<String, CompiledModel>>,
    /// Model names in registration order
    order: RwLock<Vec<String>>,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternClassifier {
    /// Create an empty classifier
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Create a classifier from parsed model definitions
    pub fn from_models(models: &[PatternModelConfig]) -> Result<Self> {
        let classifier = Self::new();
        for model in models {
            classifier.register_model(model)?;
        }
        Ok(classifier)
    }

    /// Load model definitions from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TextProcessingError::ModelLoad(format!("{}: {}", path.display(), e))
        })?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file: PatternModelsFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| TextProcessingError::ModelLoad(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| TextProcessingError::ModelLoad(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(TextProcessingError::ModelLoad(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            },
        };

        let classifier = Self::from_models(&file.models)?;
        tracing::info!(
            file = %path.display(),
            models = file.models.len(),
            "Loaded pattern classifier models"
        );
        Ok(classifier)
    }

    /// Register (or replace) one model
    pub fn register_model(&self, config: &PatternModelConfig) -> Result<()> {
        let compiled = CompiledModel::from_config(config)?;
        let replaced = self
            .models
            .write()
            .insert(config.name.clone(), compiled)
            .is_some();
        if !replaced {
            self.order.write().push(config.name.clone());
        }
        Ok(())
    }

    /// Classify synchronously
    pub fn classify_sync(&self, model: &str, utterance: &str) -> Result<ClassificationResult> {
        let models = self.models.read();
        let compiled = models
            .get(model)
            .ok_or_else(|| TextProcessingError::UnknownModel(model.to_string()))?;
        Ok(compiled.classify(utterance))
    }
}

#[async_trait]
impl IntentClassifier for PatternClassifier {
    async fn classify(
        &self,
        model: &str,
        utterance: &str,
    ) -> std::result::Result<ClassificationResult, CoreError> {
        let result = self.classify_sync(model, utterance)?;
        tracing::debug!(
            model,
            top_intent = result.top_intent().map(|i| i.name.as_str()).unwrap_or(""),
            entities = result.entities.len(),
            "Pattern classification"
        );
        Ok(result)
    }

    fn models(&self) -> Vec<String> {
        self.order.read().clone()
    }

    fn name(&self) -> &str {
        "pattern"
    }
}
