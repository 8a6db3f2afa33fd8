//! Knowledge-base answer candidates

use serde::{Deserialize, Serialize};

/// One candidate answer returned by a knowledge lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    /// Answer text (may carry a control marker prefix)
    pub text: String,
    /// Confidence in [0, 1]
    pub score: f32,
    /// Source document or entry id, when the backend reports one
    #[serde(default)]
    pub source: Option<String>,
}

impl AnswerCandidate {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
            source: None,
        }
    }

    /// Whether the text starts with the given control marker
    pub fn is_directive(&self, marker: &str) -> bool {
        !marker.is_empty() && self.text.starts_with(marker)
    }
}

/// Pick the top-scoring candidate; ties keep the earlier one
pub fn top_candidate(candidates: &[AnswerCandidate]) -> Option<&AnswerCandidate> {
    candidates.iter().fold(None, |best: Option<&AnswerCandidate>, c| match best {
        Some(b) if c.score <= b.score => Some(b),
        _ => Some(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_candidate() {
        let candidates = vec![
            AnswerCandidate::new("a", 0.3),
            AnswerCandidate::new("b", 0.8),
            AnswerCandidate::new("c", 0.8),
        ];
        assert_eq!(top_candidate(&candidates).unwrap().text, "b");
        assert!(top_candidate(&[]).is_none());
    }

    #[test]
    fn test_directive_marker() {
        let answer = AnswerCandidate::new("#@$RESET#$@ extra", 1.0);
        assert!(answer.is_directive("#@$RESET#$@"));
        assert!(!answer.is_directive(""));
        assert!(!AnswerCandidate::new("plain", 1.0).is_directive("#@$RESET#$@"));
    }
}
