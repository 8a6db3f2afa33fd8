//! Classifier factory
//!
//! Creates the configured `IntentClassifier` backend:
//! - **local**: regex pattern models from `nlu.models_path`
//! - **http**: hosted prediction endpoint with per-model application ids
//!
//! ```ignore
//! let classifier = ClassifierFactory::create(&settings.nlu)?;
//! ```

use std::path::Path;
use std::sync::Arc;

use campus_bot_config::{NluConfig, NluProvider};
use campus_bot_core::IntentClassifier;
use campus_bot_text_processing::PatternClassifier;

use crate::http::{HttpClassifier, HttpClassifierConfig};
use crate::NluError;

pub struct ClassifierFactory;

impl ClassifierFactory {
    /// Create the classifier selected by `config.provider`
    pub fn create(config: &NluConfig) -> Result<Arc<dyn IntentClassifier>, NluError> {
        let classifier: Arc<dyn IntentClassifier> = match config.provider {
            NluProvider::Local => {
                Arc::new(PatternClassifier::from_file(Path::new(&config.models_path))?)
            },
            NluProvider::Http => {
                let http_config = HttpClassifierConfig::from_settings(config)?;
                Arc::new(HttpClassifier::new(http_config)?)
            },
        };

        tracing::info!(
            provider = classifier.name(),
            models = ?classifier.models(),
            "Intent classifier ready"
        );

        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.yaml");
        std::fs::write(
            &path,
            "models:\n  - name: Dispatch\n    intents:\n      - name: QnA\n        patterns: [\"\\\\?\"]\n",
        )
        .unwrap();

        let config = NluConfig {
            models_path: path.display().to_string(),
            ..Default::default()
        };
        let classifier = ClassifierFactory::create(&config).unwrap();
        assert_eq!(classifier.name(), "pattern");
        assert!(classifier.has_model("Dispatch"));
    }

    #[test]
    fn test_create_local_missing_file() {
        let config = NluConfig {
            models_path: "/nonexistent/models.yaml".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ClassifierFactory::create(&config),
            Err(NluError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_http_requires_endpoint() {
        let config = NluConfig {
            provider: NluProvider::Http,
            ..Default::default()
        };
        assert!(ClassifierFactory::create(&config).is_err());
    }
}
