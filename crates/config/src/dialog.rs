//! Slot-filling dialog definition
//!
//! The ordered step list is fixed at construction. Each step names the slot it
//! fills, the prompt that asks for it, the validator that accepts or rejects
//! the answer, and the confirmation lines sent once the value is stored.
//!
//! ```yaml
//! dialog:
//!   start_message: "Let's get started."
//!   steps:
//!     - slot: age
//!       prompt: "How old are you?"
//!       retry_prompt: "Please enter an age between 18 and 120."
//!       validator: { kind: bounded_integer, min: 18, max: 120 }
//!       confirmation: ["I have your age as {value}."]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ConfigError;

/// Validation policy of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorConfig {
    /// Any text with at least one non-whitespace character
    NonEmptyText,
    /// Cardinal number (digits or spelled out) within `[min, max]`
    BoundedInteger { min: i64, max: i64 },
    /// Date/time expression resolving strictly after now + `min_lead_minutes`
    FutureDateTime {
        #[serde(default = "default_min_lead_minutes")]
        min_lead_minutes: i64,
    },
    /// One of a fixed set of options
    Choice { options: Vec<ChoiceOption> },
}

fn default_min_lead_minutes() -> i64 {
    60
}

/// Allowed value of a choice step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Canonical value stored in the slot
    pub value: String,
    /// Alternative spellings accepted for this value
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            synonyms: Vec::new(),
        }
    }
}

/// One step of the slot-filling sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogStepConfig {
    /// Slot filled by this step (unique across the sequence)
    pub slot: String,
    /// Question asked when the step becomes active
    pub prompt: String,
    /// Reprompt on validation failure; falls back to `dialog.generic_retry`
    #[serde(default)]
    pub retry_prompt: Option<String>,
    /// Validation policy
    pub validator: ValidatorConfig,
    /// Lines sent after a successful answer, placeholders `{value}` and `{<slot>}`
    #[serde(default)]
    pub confirmation: Vec<String>,
}

/// Slot-filling dialog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Sent once, before the first prompt of a run
    #[serde(default = "default_start_message")]
    pub start_message: Option<String>,

    /// Ordered steps
    #[serde(default = "default_steps")]
    pub steps: Vec<DialogStepConfig>,

    /// Lines sent after the last step, placeholders `{<slot>}`
    #[serde(default = "default_completion")]
    pub completion: Vec<String>,

    /// Reprompt used when a step has no dedicated one
    #[serde(default = "default_generic_retry")]
    pub generic_retry: String,

    /// Consecutive failures at one step before the run is abandoned;
    /// `None` retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Sent when the run is abandoned
    #[serde(default = "default_abandon_message")]
    pub abandon_message: String,

    /// `chrono` format used to render date slots
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_start_message() -> Option<String> {
    Some("Let's get started.".to_string())
}

fn default_steps() -> Vec<DialogStepConfig> {
    vec![
        DialogStepConfig {
            slot: "name".to_string(),
            prompt: "What is your name?".to_string(),
            retry_prompt: Some(
                "Please enter a name that contains at least one character.".to_string(),
            ),
            validator: ValidatorConfig::NonEmptyText,
            confirmation: vec!["Hi {value}.".to_string()],
        },
        DialogStepConfig {
            slot: "age".to_string(),
            prompt: "How old are you?".to_string(),
            retry_prompt: Some("Please enter an age between 18 and 120.".to_string()),
            validator: ValidatorConfig::BoundedInteger { min: 18, max: 120 },
            confirmation: vec!["I have your age as {value}.".to_string()],
        },
        DialogStepConfig {
            slot: "date".to_string(),
            prompt: "When is your flight?".to_string(),
            retry_prompt: Some("I'm sorry, please enter a date at least an hour out.".to_string()),
            validator: ValidatorConfig::FutureDateTime {
                min_lead_minutes: default_min_lead_minutes(),
            },
            confirmation: vec![
                "Your cab ride to the airport is scheduled for {value}.".to_string(),
            ],
        },
    ]
}

fn default_completion() -> Vec<String> {
    vec![
        "Thanks for completing the booking {name}.".to_string(),
        "Type anything to run the bot again.".to_string(),
    ]
}

fn default_generic_retry() -> String {
    "I'm sorry, I didn't understand that.".to_string()
}

fn default_abandon_message() -> String {
    "Let's leave it here for now. Ask me anything about the campus.".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            start_message: default_start_message(),
            steps: default_steps(),
            completion: default_completion(),
            generic_retry: default_generic_retry(),
            max_attempts: None,
            abandon_message: default_abandon_message(),
            date_format: default_date_format(),
        }
    }
}

impl DialogConfig {
    /// Number of steps in the sequence
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::invalid(
                "dialog.steps",
                "At least one step is required",
            ));
        }

        let mut seen = HashSet::new();
        for (idx, step) in self.steps.iter().enumerate() {
            let field = format!("dialog.steps[{}]", idx);

            if step.slot.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{}.slot", field), "Must not be empty"));
            }
            if !seen.insert(step.slot.as_str()) {
                return Err(ConfigError::invalid(
                    format!("{}.slot", field),
                    format!("Duplicate slot name '{}'", step.slot),
                ));
            }
            if step.prompt.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("{}.prompt", field),
                    "Must not be empty",
                ));
            }

            match &step.validator {
                ValidatorConfig::BoundedInteger { min, max } if min > max => {
                    return Err(ConfigError::invalid(
                        format!("{}.validator", field),
                        format!("Inverted range [{}, {}]", min, max),
                    ));
                },
                ValidatorConfig::FutureDateTime { min_lead_minutes } if *min_lead_minutes < 0 => {
                    return Err(ConfigError::invalid(
                        format!("{}.validator.min_lead_minutes", field),
                        "Must not be negative",
                    ));
                },
                ValidatorConfig::Choice { options } if options.is_empty() => {
                    return Err(ConfigError::invalid(
                        format!("{}.validator.options", field),
                        "At least one option is required",
                    ));
                },
                _ => {},
            }
        }

        if self.max_attempts == Some(0) {
            return Err(ConfigError::invalid(
                "dialog.max_attempts",
                "Must be at least 1 (omit it for unlimited retries)",
            ));
        }

        if self.generic_retry.trim().is_empty() {
            return Err(ConfigError::invalid(
                "dialog.generic_retry",
                "Must not be empty",
            ));
        }

        Ok(())
    }
}
