//! Entity text normalization
//!
//! Entity spans coming back from the classifier carry serialization noise:
//! line breaks, quotes, JSON array brackets and padding spaces. They are
//! stripped before the value is substituted into an answer template.

/// Characters removed from entity text besides control characters
const ARTIFACTS: [char; 5] = ['"', '\'', '[', ']', ' '];

/// Strip serialization artifacts from an entity span
///
/// Total and idempotent; empty input yields an empty string.
pub fn normalize_entity(raw: &str) -> String {
    raw.chars().filter(|c| !is_artifact(*c)).collect()
}

fn is_artifact(c: char) -> bool {
    c.is_control() || ARTIFACTS.contains(&c)
}
