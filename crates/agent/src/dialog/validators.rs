//! Step validators
//!
//! Each validator turns raw input into a slot value or a failure. Recognizer
//! misses never escape as errors: they are just another failure kind, which
//! the engine turns into a reprompt.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use campus_bot_config::{ChoiceOption, ValidatorConfig};
use campus_bot_text_processing::datetime::recognize_datetimes;
use campus_bot_text_processing::fold::fold_key;
use campus_bot_text_processing::numbers::first_integer;

use super::slots::SlotValue;

/// Why an input was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("input is empty")]
    Empty,

    #[error("no value recognized")]
    Unrecognized,

    #[error("{value} is outside [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("no recognized date is after {earliest}")]
    TooSoon { earliest: NaiveDateTime },

    #[error("not one of the allowed choices")]
    NotAChoice,
}

/// Validate `input` against a step policy
pub fn validate(
    validator: &ValidatorConfig,
    input: &str,
    now: NaiveDateTime,
) -> Result<SlotValue, ValidationFailure> {
    match validator {
        ValidatorConfig::NonEmptyText => non_empty_text(input),
        ValidatorConfig::BoundedInteger { min, max } => bounded_integer(input, *min, *max),
        ValidatorConfig::FutureDateTime { min_lead_minutes } => {
            future_datetime(input, now, *min_lead_minutes)
        },
        ValidatorConfig::Choice { options } => choice(input, options),
    }
}

fn non_empty_text(input: &str) -> Result<SlotValue, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::Empty);
    }
    Ok(SlotValue::Text(trimmed.to_string()))
}

fn bounded_integer(input: &str, min: i64, max: i64) -> Result<SlotValue, ValidationFailure> {
    if input.trim().is_empty() {
        return Err(ValidationFailure::Empty);
    }
    let value = first_integer(input).ok_or(ValidationFailure::Unrecognized)?;
    if value < min || value > max {
        return Err(ValidationFailure::OutOfRange { value, min, max });
    }
    Ok(SlotValue::Integer(value))
}

/// First recognized candidate strictly after `now + min_lead_minutes`
fn future_datetime(
    input: &str,
    now: NaiveDateTime,
    min_lead_minutes: i64,
) -> Result<SlotValue, ValidationFailure> {
    if input.trim().is_empty() {
        return Err(ValidationFailure::Empty);
    }
    let candidates = recognize_datetimes(input, now);
    if candidates.is_empty() {
        return Err(ValidationFailure::Unrecognized);
    }

    let earliest = now + Duration::minutes(min_lead_minutes);
    candidates
        .into_iter()
        .find(|candidate| *candidate > earliest)
        .map(SlotValue::DateTime)
        .ok_or(ValidationFailure::TooSoon { earliest })
}

fn choice(input: &str, options: &[ChoiceOption]) -> Result<SlotValue, ValidationFailure> {
    let key = fold_key(input);
    if key.is_empty() {
        return Err(ValidationFailure::Empty);
    }

    options
        .iter()
        .find(|option| {
            fold_key(&option.value) == key || option.synonyms.iter().any(|s| fold_key(s) == key)
        })
        .map(|option| SlotValue::Text(option.value.clone()))
        .ok_or(ValidationFailure::NotAChoice)
}
