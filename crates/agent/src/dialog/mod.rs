//! Slot-Filling Dialog Engine
//!
//! Drives the fixed, ordered step sequence from `DialogConfig`:
//!
//! ```text
//! None -> Step(0) -> Step(1) -> ... -> Step(N-1) -> None (flow complete)
//! ```
//!
//! - `None`: the input is not validated; the run starts and the first
//!   prompt is sent.
//! - `Step(k)`: the input is validated. Success stores the slot, confirms it
//!   and asks the next question (or completes the run). Failure reprompts
//!   and stays on `Step(k)`.
//! - With `max_attempts` set, that many consecutive failures at one step
//!   abandon the run.
//!
//! [`DialogEngine::step`] is pure: it takes the current state, slots and
//! input and returns the next state, slots and messages. All I/O is the
//! caller's business.

pub mod slots;
pub mod validators;

pub use slots::{CollectedSlots, SlotValue};
pub use validators::{validate, ValidationFailure};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use campus_bot_config::{render_template, DialogConfig, DialogStepConfig};

/// Position in the step sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "position", content = "step", rename_all = "snake_case")]
pub enum LastQuestion {
    /// No question outstanding
    #[default]
    None,
    /// Waiting for the answer to step `k` (0-based)
    Step(usize),
}

/// Per-conversation dialog record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogFlowState {
    /// Question whose answer is expected next
    #[serde(default)]
    pub last_question_asked: LastQuestion,
    /// Set when a run completes; free-form turns go to the classifier
    #[serde(default)]
    pub flow_complete: bool,
    /// Consecutive validation failures at the current step
    #[serde(default)]
    pub failed_attempts: u32,
}

impl DialogFlowState {
    /// Whether the next message belongs to the dialog
    pub fn is_active(&self) -> bool {
        !self.flow_complete
    }

    /// Clear the completion flag so the next message starts a new run
    pub fn rearm(&mut self) {
        self.flow_complete = false;
        self.last_question_asked = LastQuestion::None;
        self.failed_attempts = 0;
    }

    fn finish(&mut self) {
        self.flow_complete = true;
        self.last_question_asked = LastQuestion::None;
        self.failed_attempts = 0;
    }
}

/// What a step did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A run started; the first prompt was sent
    Started,
    /// A slot was filled and the next prompt sent
    Advanced { slot: String },
    /// The last slot was filled; slots cleared and flow marked complete
    Completed,
    /// Input rejected; the same step will be retried
    Retry {
        slot: String,
        failure: ValidationFailure,
    },
    /// Retry ceiling reached; slots cleared and flow marked complete
    Abandoned { slot: String },
}

/// Result of one engine step
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub flow: DialogFlowState,
    pub slots: CollectedSlots,
    /// Outbound messages, in send order
    pub messages: Vec<String>,
    pub outcome: StepOutcome,
}

/// Slot-filling state machine over a fixed step list
#[derive(Debug, Clone)]
pub struct DialogEngine {
    config: DialogConfig,
}

impl DialogEngine {
    /// Create an engine; the step list must be non-empty (see
    /// `DialogConfig::validate`)
    pub fn new(config: DialogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DialogConfig {
        &self.config
    }

    pub fn steps(&self) -> &[DialogStepConfig] {
        &self.config.steps
    }

    /// Bring a loaded record back inside the step sequence
    ///
    /// A record that points past the end (the step list shrank since it was
    /// written) restarts from `None`.
    pub fn sanitize(&self, mut flow: DialogFlowState) -> DialogFlowState {
        if let LastQuestion::Step(k) = flow.last_question_asked {
            if k >= self.config.steps.len() {
                tracing::warn!(
                    step = k,
                    steps = self.config.steps.len(),
                    "Stored dialog step out of range, restarting"
                );
                flow.last_question_asked = LastQuestion::None;
                flow.failed_attempts = 0;
            }
        }
        flow
    }

    /// Advance the state machine by one turn
    pub fn step(
        &self,
        flow: &DialogFlowState,
        slots: &CollectedSlots,
        input: &str,
        now: NaiveDateTime,
    ) -> Transition {
        let mut flow = self.sanitize(flow.clone());
        let mut slots = slots.clone();
        let mut messages = Vec::new();

        let k = match flow.last_question_asked {
            LastQuestion::None => {
                slots.clear();
                flow.last_question_asked = LastQuestion::Step(0);
                flow.failed_attempts = 0;
                if let Some(start) = &self.config.start_message {
                    messages.push(start.clone());
                }
                if let Some(first) = self.config.steps.first() {
                    messages.push(first.prompt.clone());
                }
                return Transition {
                    flow,
                    slots,
                    messages,
                    outcome: StepOutcome::Started,
                };
            },
            LastQuestion::Step(k) => k,
        };

        let step = &self.config.steps[k];
        match validate(&step.validator, input, now) {
            Ok(value) => {
                let rendered_value = value.render(&self.config.date_format);
                slots.insert(step.slot.clone(), value);
                flow.failed_attempts = 0;

                let mut values = slots.rendered(&self.config.date_format);
                values.insert("value".to_string(), rendered_value);
                messages.extend(
                    step.confirmation
                        .iter()
                        .map(|line| render_template(line, &values)),
                );

                match self.config.steps.get(k + 1) {
                    Some(next) => {
                        flow.last_question_asked = LastQuestion::Step(k + 1);
                        messages.push(next.prompt.clone());
                        Transition {
                            flow,
                            slots,
                            messages,
                            outcome: StepOutcome::Advanced {
                                slot: step.slot.clone(),
                            },
                        }
                    },
                    None => {
                        messages.extend(self.completion_messages(&slots));
                        slots.clear();
                        flow.finish();
                        Transition {
                            flow,
                            slots,
                            messages,
                            outcome: StepOutcome::Completed,
                        }
                    },
                }
            },
            Err(failure) => {
                flow.failed_attempts = flow.failed_attempts.saturating_add(1);

                if let Some(max) = self.config.max_attempts {
                    if flow.failed_attempts >= max {
                        messages.push(self.config.abandon_message.clone());
                        slots.clear();
                        flow.finish();
                        return Transition {
                            flow,
                            slots,
                            messages,
                            outcome: StepOutcome::Abandoned {
                                slot: step.slot.clone(),
                            },
                        };
                    }
                }

                messages.push(
                    step.retry_prompt
                        .clone()
                        .unwrap_or_else(|| self.config.generic_retry.clone()),
                );
                Transition {
                    flow,
                    slots,
                    messages,
                    outcome: StepOutcome::Retry {
                        slot: step.slot.clone(),
                        failure,
                    },
                }
            },
        }
    }

    fn completion_messages(&self, slots: &CollectedSlots) -> Vec<String> {
        let values: BTreeMap<String, String> = slots.rendered(&self.config.date_format);
        self.config
            .completion
            .iter()
            .map(|line| render_template(line, &values))
            .collect()
    }
}
