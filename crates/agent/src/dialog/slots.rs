//! Collected slot values

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Fallback when the configured date format cannot be rendered
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One validated slot value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    Text(String),
    Integer(i64),
    DateTime(NaiveDateTime),
}

impl SlotValue {
    /// User-facing rendering; dates use `date_format`
    pub fn render(&self, date_format: &str) -> String {
        match self {
            SlotValue::Text(text) => text.clone(),
            SlotValue::Integer(value) => value.to_string(),
            SlotValue::DateTime(at) => {
                let mut rendered = String::new();
                if write!(rendered, "{}", at.format(date_format)).is_err() {
                    tracing::warn!(date_format, "Invalid date format, using default");
                    rendered.clear();
                    let _ = write!(rendered, "{}", at.format(DEFAULT_DATE_FORMAT));
                }
                rendered
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SlotValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SlotValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            SlotValue::DateTime(at) => Some(*at),
            _ => None,
        }
    }
}

/// Slot record of one user, keyed by slot name
///
/// A value is only ever inserted after its step's validator accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedSlots {
    values: BTreeMap<String, SlotValue>,
}

impl CollectedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<&SlotValue> {
        self.values.get(slot)
    }

    pub(crate) fn insert(&mut self, slot: impl Into<String>, value: SlotValue) {
        self.values.insert(slot.into(), value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SlotValue)> {
        self.values.iter()
    }

    /// Rendered values for template substitution
    pub fn rendered(&self, date_format: &str) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(slot, value)| (slot.clone(), value.render(date_format)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 11, 14)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_render() {
        assert_eq!(SlotValue::Text("Ana".into()).render("%Y"), "Ana");
        assert_eq!(SlotValue::Integer(20).render("%Y"), "20");
        assert_eq!(
            SlotValue::DateTime(at()).render("%Y-%m-%d %H:%M"),
            "2018-11-14 21:00"
        );
    }

    #[test]
    fn test_invalid_date_format_falls_back() {
        assert_eq!(SlotValue::DateTime(at()).render("%Q"), "2018-11-14 21:00");
    }

    #[test]
    fn test_serialized_shape() {
        let mut slots = CollectedSlots::new();
        slots.insert("age", SlotValue::Integer(20));
        slots.insert("name", SlotValue::Text("Ana".into()));

        let json = serde_json::to_value(&slots).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "age": {"type": "integer", "value": 20},
                "name": {"type": "text", "value": "Ana"}
            })
        );
        let back: CollectedSlots = serde_json::from_value(json).unwrap();
        assert_eq!(back, slots);
    }

    #[test]
    fn test_rendered_map() {
        let mut slots = CollectedSlots::new();
        slots.insert("date", SlotValue::DateTime(at()));
        let rendered = slots.rendered("%d/%m %H:%M");
        assert_eq!(rendered.get("date").map(String::as_str), Some("14/11 21:00"));
    }
}
