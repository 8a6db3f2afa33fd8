//! Knowledge base trait

use async_trait::async_trait;

use crate::error::Result;
use crate::knowledge::AnswerCandidate;

/// Question-answer lookup service
#[async_trait]
pub trait KnowledgeBase: Send + Sync + 'static {
    /// Look up answers for a question
    ///
    /// Returns zero or more candidates; an empty list means "no answer".
    async fn lookup(&self, question: &str) -> Result<Vec<AnswerCandidate>>;

    /// Registered knowledge-base name
    fn name(&self) -> &str;
}
