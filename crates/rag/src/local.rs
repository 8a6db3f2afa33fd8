//! Local question/answer knowledge base
//!
//! Scores every entry against the query and returns the best ones:
//! - Exact match of the folded question (case, accents and punctuation
//!   ignored) scores 1.0
//! - Otherwise the Dice overlap of content tokens, best question per entry
//! - Candidates below `min_score` are dropped; at most `top_k` returned,
//!   best first, ties in file order

use async_trait::async_trait;
use std::collections::HashSet;

use campus_bot_core::{AnswerCandidate, CoreError, KnowledgeBase};
use campus_bot_text_processing::fold::{fold_key, tokens};

use crate::knowledge_loader::KnowledgeEntry;

/// Function words ignored by overlap scoring
const STOP_WORDS: &[&str] = &[
    "a", "al", "an", "and", "de", "del", "el", "en", "es", "is", "la", "las", "lo", "los", "me",
    "mi", "of", "para", "por", "que", "the", "to", "un", "una", "y",
];

/// Local knowledge base configuration
#[derive(Debug, Clone)]
pub struct LocalKnowledgeConfig {
    /// Registered name
    pub name: String,
    /// Minimum score in [0, 1]
    pub min_score: f32,
    /// Maximum candidates returned
    pub top_k: usize,
}

impl Default for LocalKnowledgeConfig {
    fn default() -> Self {
        Self {
            name: "campus-faq".to_string(),
            min_score: 0.3,
            top_k: 3,
        }
    }
}

struct IndexedQuestion {
    key: String,
    tokens: HashSet<String>,
}

struct IndexedEntry {
    entry: KnowledgeEntry,
    questions: Vec<IndexedQuestion>,
}

fn content_tokens(text: &str) -> HashSet<String> {
    tokens(text)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn dice(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    (2 * shared) as f32 / (a.len() + b.len()) as f32
}

/// In-memory knowledge base over question/answer entries
pub struct LocalKnowledgeBase {
    config: LocalKnowledgeConfig,
    entries: Vec<IndexedEntry>,
}

impl LocalKnowledgeBase {
    /// Create a new knowledge base from entries
    pub fn new(config: LocalKnowledgeConfig, entries: Vec<KnowledgeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let questions = entry
                    .questions
                    .iter()
                    .map(|q| IndexedQuestion {
                        key: fold_key(q),
                        tokens: content_tokens(q),
                    })
                    .collect();
                IndexedEntry { entry, questions }
            })
            .collect();

        Self { config, entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score all entries and keep the best
    pub fn search(&self, question: &str) -> Vec<AnswerCandidate> {
        let key = fold_key(question);
        if key.is_empty() {
            return Vec::new();
        }
        let query_tokens = content_tokens(question);

        let mut scored: Vec<(f32, &KnowledgeEntry)> = self
            .entries
            .iter()
            .filter_map(|indexed| {
                let score = indexed
                    .questions
                    .iter()
                    .map(|q| {
                        if q.key == key {
                            1.0
                        } else {
                            dice(&query_tokens, &q.tokens)
                        }
                    })
                    .fold(0.0_f32, f32::max);
                (score >= self.config.min_score && score > 0.0).then_some((score, &indexed.entry))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.top_k);

        scored
            .into_iter()
            .map(|(score, entry)| AnswerCandidate {
                text: entry.answer.clone(),
                score,
                source: Some(entry.id.clone()),
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeBase for LocalKnowledgeBase {
    async fn lookup(&self, question: &str) -> Result<Vec<AnswerCandidate>, CoreError> {
        let candidates = self.search(question);
        tracing::debug!(
            knowledge_base = %self.config.name,
            candidates = candidates.len(),
            top_score = candidates.first().map(|c| c.score).unwrap_or(0.0),
            "Local knowledge lookup"
        );
        Ok(candidates)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, questions: &[&str], answer: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            id: id.to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
            answer: answer.to_string(),
            category: None,
        }
    }

    fn kb() -> LocalKnowledgeBase {
        LocalKnowledgeBase::new(
            LocalKnowledgeConfig::default(),
            vec![
                entry(
                    "biblioteca",
                    &["¿Cuál es el horario de la biblioteca?", "horario biblioteca"],
                    "La biblioteca abre de 8:00 a 21:00.",
                ),
                entry(
                    "general",
                    &["Información_general"],
                    "Bienvenido a $campus. Todo sobre el campus @campus.",
                ),
                entry("cafeteria", &["horario de la cafetería"], "De 7:00 a 18:00."),
            ],
        )
    }

    #[test]
    fn test_exact_match_scores_one() {
        let candidates = kb().search("informacion_general");
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[0].source.as_deref(), Some("general"));
    }

    #[test]
    fn test_overlap_ranking() {
        let candidates = kb().search("¿Qué horario tiene la BIBLIOTECA?");
        assert_eq!(candidates[0].source.as_deref(), Some("biblioteca"));
        assert!(candidates[0].score < 1.0);
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_min_score_and_top_k() {
        let kb = LocalKnowledgeBase::new(
            LocalKnowledgeConfig {
                min_score: 0.9,
                top_k: 1,
                ..Default::default()
            },
            vec![
                entry("a", &["horario biblioteca"], "A"),
                entry("b", &["horario biblioteca"], "B"),
            ],
        );
        let candidates = kb.search("horario biblioteca");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "A");

        assert!(kb.search("horario").is_empty());
    }

    #[test]
    fn test_no_match() {
        assert!(kb().search("xyz").is_empty());
        assert!(kb().search("   ").is_empty());
    }

    #[tokio::test]
    async fn test_lookup_trait() {
        let kb = kb();
        assert_eq!(kb.name(), "campus-faq");
        let candidates = kb.lookup("horario biblioteca").await.unwrap();
        assert_eq!(candidates[0].text, "La biblioteca abre de 8:00 a 21:00.");
    }
}
