//! Routing constants
//!
//! Reserved labels shared with the trained classifier models and the
//! knowledge base content. None of them are structural; deployments rename
//! them freely as long as the models agree.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Reserved intent labels, model names and markers used by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Top-level model that picks a route
    #[serde(default = "default_dispatch_model")]
    pub dispatch_model: String,

    /// Intent meaning "nothing matched"
    #[serde(default = "default_none_intent")]
    pub none_intent: String,

    /// Intent routed to the knowledge base
    #[serde(default = "default_qna_intent")]
    pub qna_intent: String,

    /// Separator between model name and sub-intent qualifier in dispatch labels
    #[serde(default = "default_model_separator")]
    pub model_separator: char,

    /// Model whose intents get second-level routing
    #[serde(default = "default_campus_model")]
    pub campus_model: String,

    /// Intent (inside the campus model) answered by entity substitution
    #[serde(default = "default_general_info_intent")]
    pub general_info_intent: String,

    /// Answer prefix that re-arms the slot-filling flow instead of being shown
    #[serde(default = "default_reset_marker")]
    pub reset_marker: String,

    /// Registered name of the knowledge base to query
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: String,

    /// Placeholder replaced by the capitalized entity value
    #[serde(default = "default_capitalized_placeholder")]
    pub capitalized_placeholder: String,

    /// Placeholder replaced by the lowercased entity value
    #[serde(default = "default_lowercase_placeholder")]
    pub lowercase_placeholder: String,

    /// Entities required before substitution is attempted
    #[serde(default = "default_min_entities")]
    pub min_entities: usize,
}

fn default_dispatch_model() -> String {
    "Dispatch".to_string()
}
fn default_none_intent() -> String {
    "None".to_string()
}
fn default_qna_intent() -> String {
    "QnA".to_string()
}
fn default_model_separator() -> char {
    '_'
}
fn default_campus_model() -> String {
    "Campus".to_string()
}
fn default_general_info_intent() -> String {
    "Información_general".to_string()
}
fn default_reset_marker() -> String {
    "#@$RESET#$@".to_string()
}
fn default_knowledge_base() -> String {
    "campus-faq".to_string()
}
fn default_capitalized_placeholder() -> String {
    "$campus".to_string()
}
fn default_lowercase_placeholder() -> String {
    "@campus".to_string()
}
fn default_min_entities() -> usize {
    2
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            dispatch_model: default_dispatch_model(),
            none_intent: default_none_intent(),
            qna_intent: default_qna_intent(),
            model_separator: default_model_separator(),
            campus_model: default_campus_model(),
            general_info_intent: default_general_info_intent(),
            reset_marker: default_reset_marker(),
            knowledge_base: default_knowledge_base(),
            capitalized_placeholder: default_capitalized_placeholder(),
            lowercase_placeholder: default_lowercase_placeholder(),
            min_entities: default_min_entities(),
        }
    }
}

impl RoutingConfig {
    /// Model name encoded in a dispatch intent label
    ///
    /// Everything after the first separator is a sub-intent qualifier and is
    /// ignored: `"Campus_horarios"` routes to `"Campus"`.
    pub fn model_for_intent<'a>(&self, intent: &'a str) -> &'a str {
        match intent.find(self.model_separator) {
            Some(idx) => &intent[..idx],
            None => intent,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let labels = [
            ("routing.dispatch_model", &self.dispatch_model),
            ("routing.none_intent", &self.none_intent),
            ("routing.qna_intent", &self.qna_intent),
            ("routing.campus_model", &self.campus_model),
            ("routing.general_info_intent", &self.general_info_intent),
            ("routing.reset_marker", &self.reset_marker),
            ("routing.knowledge_base", &self.knowledge_base),
            ("routing.capitalized_placeholder", &self.capitalized_placeholder),
            ("routing.lowercase_placeholder", &self.lowercase_placeholder),
        ];

        for (field, value) in labels {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "Must not be empty"));
            }
        }

        if self.min_entities == 0 {
            return Err(ConfigError::invalid(
                "routing.min_entities",
                "At least one entity is required for substitution",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_for_intent() {
        let routing = RoutingConfig::default();
        assert_eq!(routing.model_for_intent("Campus_horarios"), "Campus");
        assert_eq!(routing.model_for_intent("Campus_a_b"), "Campus");
        assert_eq!(routing.model_for_intent("Becas"), "Becas");
        assert_eq!(routing.model_for_intent("_x"), "");
    }

    #[test]
    fn test_routing_validation() {
        let mut routing = RoutingConfig::default();
        assert!(routing.validate().is_ok());

        routing.none_intent = " ".to_string();
        assert!(routing.validate().is_err());
    }
}
