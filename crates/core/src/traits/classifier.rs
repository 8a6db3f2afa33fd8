//! Intent classifier trait

use async_trait::async_trait;

use crate::error::Result;
use crate::recognition::ClassificationResult;

/// Classifies an utterance against a named model
///
/// A single backend usually hosts several models: the dispatch model that
/// picks a route, plus one model per domain. Implementations must return
/// intents in their own native order; callers decide how to rank.
///
/// # Example
///
/// ```ignore
/// let result = classifier.classify("Dispatch", "¿Dónde está la biblioteca?").await?;
/// if let Some(top) = result.top_intent() {
///     println!("{} ({:.2})", top.name, top.score);
/// }
/// ```
#[async_trait]
pub trait IntentClassifier: Send + Sync + 'static {
    /// Classify `utterance` with the model registered as `model`
    ///
    /// # Errors
    /// `CoreError::UnknownModel` when the model is not registered,
    /// `CoreError::Classifier` for any backend failure.
    async fn classify(&self, model: &str, utterance: &str) -> Result<ClassificationResult>;

    /// Names of the models this classifier can serve
    fn models(&self) -> Vec<String>;

    /// Whether `model` is served by this classifier
    fn has_model(&self, model: &str) -> bool {
        self.models().iter().any(|m| m == model)
    }

    /// Backend name, for logging
    fn name(&self) -> &str;
}
