//! Intent classification results

use serde::{Deserialize, Serialize};

/// One ranked intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    /// Intent label
    pub name: String,
    /// Confidence in [0, 1]
    pub score: f32,
}

impl IntentScore {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// An entity extracted by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type (e.g. "campus")
    pub entity_type: String,
    /// Raw text span as serialized by the classifier
    pub text: String,
    /// Start offset in the utterance
    pub start: usize,
    /// End offset in the utterance (exclusive)
    pub end: usize,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.len();
        Self {
            entity_type: entity_type.into(),
            text,
            start,
            end,
        }
    }
}

/// Classifier output for one utterance against one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassificationResult {
    /// The utterance that was classified
    pub text: String,
    /// Intents in the order the classifier returned them
    pub intents: Vec<IntentScore>,
    /// Extracted entities in extraction order (may be empty)
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl ClassificationResult {
    pub fn new(text: impl Into<String>, intents: Vec<IntentScore>) -> Self {
        Self {
            text: text.into(),
            intents,
            entities: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    /// Highest scoring intent; ties keep the first one the classifier returned
    pub fn top_intent(&self) -> Option<&IntentScore> {
        let mut best: Option<&IntentScore> = None;
        for intent in &self.intents {
            match best {
                Some(current) if intent.score <= current.score => {},
                _ => best = Some(intent),
            }
        }
        best
    }

    /// First intent in classifier order, without re-sorting
    pub fn first_intent(&self) -> Option<&IntentScore> {
        self.intents.first()
    }

    /// Extracted entities
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
