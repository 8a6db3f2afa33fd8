//! Localized user-visible strings for the free-form layer

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ConfigError;

/// Free-form (non slot-filling) messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Sent when nothing useful was recognized
    #[serde(default = "default_didnt_understand")]
    pub didnt_understand: String,

    /// Sent when the dispatch classifier returned nothing usable
    #[serde(default = "default_unable_to_determine_intent")]
    pub unable_to_determine_intent: String,

    /// Welcome template, placeholders `{name}` and `{text}`
    #[serde(default = "default_welcome")]
    pub welcome: String,

    /// Body of the welcome message
    #[serde(default = "default_welcome_text")]
    pub welcome_text: String,

    /// Acknowledgement for other activity types, placeholder `{event}`
    #[serde(default = "default_event_detected")]
    pub event_detected: String,
}

fn default_didnt_understand() -> String {
    "Perdón, no te he entendido.".to_string()
}
fn default_unable_to_determine_intent() -> String {
    "No he podido determinar tu intención.".to_string()
}
fn default_welcome() -> String {
    "Welcome, {name}. {text}".to_string()
}
fn default_welcome_text() -> String {
    "Soy el asistente del campus. Pregúntame por horarios, servicios o sedes.".to_string()
}
fn default_event_detected() -> String {
    "{event} event detected".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            didnt_understand: default_didnt_understand(),
            unable_to_determine_intent: default_unable_to_determine_intent(),
            welcome: default_welcome(),
            welcome_text: default_welcome_text(),
            event_detected: default_event_detected(),
        }
    }
}

impl MessagesConfig {
    /// Welcome line for a newly added member
    pub fn welcome_for(&self, name: &str) -> String {
        let mut values = BTreeMap::new();
        values.insert("name", name.to_string());
        values.insert("text", self.welcome_text.clone());
        render_template(&self.welcome, &values)
    }

    /// Acknowledgement for an unhandled activity type
    pub fn event_detected_for(&self, event: &str) -> String {
        let mut values = BTreeMap::new();
        values.insert("event", event.to_string());
        render_template(&self.event_detected, &values)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.didnt_understand.trim().is_empty() {
            return Err(ConfigError::invalid(
                "messages.didnt_understand",
                "Must not be empty",
            ));
        }
        if self.unable_to_determine_intent.trim().is_empty() {
            return Err(ConfigError::invalid(
                "messages.unable_to_determine_intent",
                "Must not be empty",
            ));
        }
        Ok(())
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Replace `{key}` placeholders with values in a single pass
///
/// Substituted values are never scanned for placeholders. Unknown
/// placeholders are left untouched.
pub fn render_template<K, V>(template: &str, values: &BTreeMap<K, V>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .iter()
                .find(|(key, _)| key.as_ref() == &caps[1])
                .map(|(_, value)| value.as_ref().to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
