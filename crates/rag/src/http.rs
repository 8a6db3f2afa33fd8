//! Hosted QnA service client
//!
//! ```text
//! POST {host}/knowledgebases/{kb_id}/generateAnswer
//! Authorization: EndpointKey {key}
//! { "question": "...", "top": 3 }
//!
//! { "answers": [
//!     { "answer": "...", "score": 87.3, "id": 12, "questions": [...], "source": "..." }
//! ] }
//! ```
//!
//! Scores come back on a 0-100 scale and are normalized to [0, 1]. The
//! service's "no good match" placeholder (id -1 / score 0) is dropped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use campus_bot_config::KnowledgeConfig;
use campus_bot_core::{AnswerCandidate, CoreError, KnowledgeBase};

use crate::RagError;

/// Hosted knowledge base configuration
#[derive(Debug, Clone)]
pub struct HttpKnowledgeBaseConfig {
    /// Registered name
    pub name: String,
    /// Service base URL (e.g. `https://campus-qna.azurewebsites.net/qnamaker`)
    pub host: String,
    /// Knowledge base id
    pub kb_id: String,
    /// Endpoint key
    pub endpoint_key: Option<String>,
    /// Candidates requested
    pub top: usize,
    /// Minimum normalized score
    pub min_score: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl HttpKnowledgeBaseConfig {
    /// Build from the `knowledge` settings section
    pub fn from_settings(config: &KnowledgeConfig) -> Result<Self, RagError> {
        let host = config
            .host
            .clone()
            .ok_or_else(|| RagError::Configuration("knowledge.host is required".to_string()))?;
        let kb_id = config
            .kb_id
            .clone()
            .ok_or_else(|| RagError::Configuration("knowledge.kb_id is required".to_string()))?;

        Ok(Self {
            name: config.name.clone(),
            host: host.trim_end_matches('/').to_string(),
            kb_id,
            endpoint_key: config.endpoint_key.clone(),
            top: config.top_k,
            min_score: config.min_score,
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(200),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateAnswerRequest<'a> {
    question: &'a str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateAnswerResponse {
    #[serde(default)]
    answers: Vec<QnaAnswer>,
}

#[derive(Debug, Deserialize)]
struct QnaAnswer {
    answer: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    source: Option<String>,
}

/// Knowledge base backed by a hosted QnA service
pub struct HttpKnowledgeBase {
    client: Client,
    config: HttpKnowledgeBaseConfig,
}

impl HttpKnowledgeBase {
    /// Create a new hosted knowledge base client
    pub fn new(config: HttpKnowledgeBaseConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn answer_url(&self) -> String {
        format!(
            "{}/knowledgebases/{}/generateAnswer",
            self.config.host, self.config.kb_id
        )
    }

    /// Query the service with retry on transient failures
    pub async fn generate_answer(&self, question: &str) -> Result<Vec<AnswerCandidate>, RagError> {
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "QnA request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(question).await {
                Ok(response) => return Ok(self.to_candidates(response)),
                Err(e @ RagError::Connection(_)) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| RagError::Connection("Max retries exceeded".to_string())))
    }

    async fn execute_request(&self, question: &str) -> Result<GenerateAnswerResponse, RagError> {
        let mut request = self.client.post(self.answer_url()).json(&GenerateAnswerRequest {
            question,
            top: self.config.top,
        });
        if let Some(key) = &self.config.endpoint_key {
            request = request.header("Authorization", format!("EndpointKey {}", key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            // 5xx errors are retryable, 4xx are not
            if status.is_server_error() {
                return Err(RagError::Connection(format!("Server error {}: {}", status, error)));
            }
            return Err(RagError::Api(format!("HTTP {}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| RagError::InvalidResponse(e.to_string()))
    }

    fn to_candidates(&self, response: GenerateAnswerResponse) -> Vec<AnswerCandidate> {
        let mut candidates: Vec<AnswerCandidate> = response
            .answers
            .into_iter()
            .filter(|a| a.id != Some(-1) && a.score > 0.0)
            .map(|a| AnswerCandidate {
                text: a.answer,
                score: (a.score / 100.0).clamp(0.0, 1.0),
                source: a.source,
            })
            .filter(|c| c.score >= self.config.min_score)
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn lookup(&self, question: &str) -> Result<Vec<AnswerCandidate>, CoreError> {
        Ok(self.generate_answer(question).await?)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
