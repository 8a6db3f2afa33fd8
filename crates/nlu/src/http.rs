//! Hosted intent-recognition client
//!
//! Talks to a LUIS-v2-style prediction endpoint:
//!
//! ```text
//! GET {endpoint}/luis/v2.0/apps/{app_id}?q=...&verbose=true&subscription-key=...
//!
//! { "query": "...",
//!   "topScoringIntent": { "intent": "QnA", "score": 0.92 },
//!   "intents":  [ { "intent": "QnA", "score": 0.92 }, ... ],
//!   "entities": [ { "entity": "norte", "type": "campus", "startIndex": 22, "endIndex": 26 } ] }
//! ```
//!
//! Each classifier model name maps to one hosted application id.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use campus_bot_config::NluConfig;
use campus_bot_core::{ClassificationResult, CoreError, Entity, IntentClassifier, IntentScore};

use crate::NluError;

/// Hosted classifier configuration
#[derive(Debug, Clone)]
pub struct HttpClassifierConfig {
    /// Endpoint base URL
    pub endpoint: String,
    /// Subscription key sent as a query parameter
    pub subscription_key: Option<String>,
    /// Model name → application id
    pub apps: HashMap<String, String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for HttpClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            subscription_key: None,
            apps: HashMap::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl HttpClassifierConfig {
    /// Build from the `nlu` settings section
    pub fn from_settings(config: &NluConfig) -> Result<Self, NluError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| NluError::Configuration("nlu.endpoint is required".to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_key: config.subscription_key.clone(),
            apps: config.apps.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictionResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    top_scoring_intent: Option<PredictedIntent>,
    #[serde(default)]
    intents: Vec<PredictedIntent>,
    #[serde(default)]
    entities: Vec<PredictedEntity>,
}

#[derive(Debug, Deserialize)]
struct PredictedIntent {
    intent: String,
    #[serde(default)]
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictedEntity {
    entity: String,
    #[serde(rename = "type")]
    entity_type: String,
    start_index: usize,
    /// Inclusive
    end_index: usize,
}

impl PredictionResponse {
    fn into_result(self, utterance: &str) -> ClassificationResult {
        let mut intents: Vec<IntentScore> = self
            .intents
            .into_iter()
            .map(|i| IntentScore::new(i.intent, i.score.unwrap_or(0.0)))
            .collect();

        // Non-verbose responses only carry the top intent
        if intents.is_empty() {
            if let Some(top) = self.top_scoring_intent {
                intents.push(IntentScore::new(top.intent, top.score.unwrap_or(0.0)));
            }
        }

        let entities = self
            .entities
            .into_iter()
            .map(|e| Entity {
                entity_type: e.entity_type,
                text: e.entity,
                start: e.start_index,
                end: e.end_index + 1,
            })
            .collect();

        let text = if self.query.is_empty() {
            utterance.to_string()
        } else {
            self.query
        };

        ClassificationResult::new(text, intents).with_entities(entities)
    }
}

/// Classifier backed by a hosted prediction endpoint
pub struct HttpClassifier {
    client: Client,
    config: HttpClassifierConfig,
}

impl HttpClassifier {
    /// Create a new hosted classifier
    pub fn new(config: HttpClassifierConfig) -> Result<Self, NluError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NluError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn app_url(&self, app_id: &str) -> String {
        format!("{}/luis/v2.0/apps/{}", self.config.endpoint, app_id)
    }

    /// Classify with retry on transient failures
    pub async fn predict(
        &self,
        model: &str,
        utterance: &str,
    ) -> Result<ClassificationResult, NluError> {
        let app_id = self
            .config
            .apps
            .get(model)
            .ok_or_else(|| NluError::UnknownModel(model.to_string()))?;

        // Retry loop with exponential backoff
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    model,
                    "Prediction request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(app_id, utterance).await {
                Ok(response) => return Ok(response.into_result(utterance)),
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                },
                Err(e) => {
                    return Err(e);
                },
            }
        }

        Err(last_error.unwrap_or_else(|| NluError::Network("Max retries exceeded".to_string())))
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        app_id: &str,
        utterance: &str,
    ) -> Result<PredictionResponse, NluError> {
        let mut request = self
            .client
            .get(self.app_url(app_id))
            .query(&[("q", utterance), ("verbose", "true")]);
        if let Some(key) = &self.config.subscription_key {
            request = request.query(&[("subscription-key", key.as_str())]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            // 5xx errors are retryable, 4xx are not
            if status.is_server_error() {
                return Err(NluError::Network(format!("Server error {}: {}", status, error)));
            }
            return Err(NluError::Api(format!("HTTP {}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| NluError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &NluError) -> bool {
        matches!(error, NluError::Network(_) | NluError::Timeout)
    }
}

#[async_trait]
impl IntentClassifier for HttpClassifier {
    async fn classify(
        &self,
        model: &str,
        utterance: &str,
    ) -> Result<ClassificationResult, CoreError> {
        Ok(self.predict(model, utterance).await?)
    }

    fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.config.apps.keys().cloned().collect();
        models.sort();
        models
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(endpoint: String) -> HttpClassifierConfig {
        let mut apps = HashMap::new();
        apps.insert("Dispatch".to_string(), "app-dispatch".to_string());
        apps.insert("Campus".to_string(), "app-campus".to_string());
        HttpClassifierConfig {
            endpoint,
            subscription_key: Some("secret".to_string()),
            apps,
            timeout: Duration::from_secs(2),
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_response_mapping() {
        let json = r#"{
            "query": "informacion del campus norte",
            "topScoringIntent": {"intent": "Información_general", "score": 0.97},
            "intents": [
                {"intent": "Información_general", "score": 0.97},
                {"intent": "None", "score": 0.02}
            ],
            "entities": [
                {"entity": "campus", "type": "campus", "startIndex": 16, "endIndex": 21, "score": 0.9},
                {"entity": "norte", "type": "campus_name", "startIndex": 23, "endIndex": 27}
            ]
        }"#;
        let response: PredictionResponse = serde_json::from_str(json).unwrap();
        let result = response.into_result("ignored");

        assert_eq!(result.text, "informacion del campus norte");
        assert_eq!(result.intents.len(), 2);
        assert_eq!(result.entities[1].text, "norte");
        assert_eq!(result.entities[1].end, 28);
    }

    #[test]
    fn test_top_intent_only_response() {
        let json = r#"{"query": "hola", "topScoringIntent": {"intent": "None", "score": 0.6}}"#;
        let response: PredictionResponse = serde_json::from_str(json).unwrap();
        let result = response.into_result("hola");
        assert_eq!(result.intents, vec![IntentScore::new("None", 0.6)]);
        assert!(result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_predict_against_endpoint() {
        async fn predict(
            Path(app): Path<String>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<serde_json::Value> {
            assert_eq!(params.get("subscription-key").map(String::as_str), Some("secret"));
            let intent = if app == "app-dispatch" { "QnA" } else { "None" };
            Json(serde_json::json!({
                "query": params.get("q").cloned().unwrap_or_default(),
                "intents": [{"intent": intent, "score": 0.9}],
                "entities": []
            }))
        }

        let router = Router::new().route("/luis/v2.0/apps/:app", get(predict));
        let classifier = HttpClassifier::new(config(serve(router).await)).unwrap();

        let result = classifier.classify("Dispatch", "¿horarios?").await.unwrap();
        assert_eq!(result.top_intent().unwrap().name, "QnA");
        assert_eq!(result.text, "¿horarios?");
        assert_eq!(classifier.models(), vec!["Campus", "Dispatch"]);
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let classifier = HttpClassifier::new(config("http://127.0.0.1:9".to_string())).unwrap();
        let err = classifier.classify("Becas", "hola").await.unwrap_err();
        assert_eq!(err, CoreError::UnknownModel("Becas".to_string()));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/luis/v2.0/apps/:app",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StatusCode::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(serde_json::json!({
                            "intents": [{"intent": "None", "score": 1.0}]
                        })))
                    }
                }
            }),
        );
        let classifier = HttpClassifier::new(config(serve(router).await)).unwrap();

        let result = classifier.predict("Dispatch", "x").await.unwrap();
        assert_eq!(result.top_intent().unwrap().name, "None");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/luis/v2.0/apps/:app",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
        let classifier = HttpClassifier::new(config(serve(router).await)).unwrap();

        let err = classifier.predict("Dispatch", "x").await.unwrap_err();
        assert!(matches!(err, NluError::Api(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
