//! HTTP Endpoints
//!
//! - `POST /api/messages` - one channel activity in, the turn's replies out
//! - `GET /health` - adapter and configuration status
//! - `GET /metrics` - Prometheus exposition

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use campus_bot_core::Activity;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings().server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);

    Router::new()
        .route("/api/messages", post(post_activity))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins
///
/// - `enabled: false` allows every origin
/// - no (valid) origins falls back to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", DEFAULT_CORS_ORIGIN);
        return layer.allow_origin(HeaderValue::from_static(DEFAULT_CORS_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Replies produced by one turn, in send order
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub responses: Vec<String>,
}

async fn post_activity(
    State(state): State<AppState>,
    Json(activity): Json<Activity>,
) -> Result<Json<MessagesResponse>, ServerError> {
    tracing::debug!(
        conversation_id = %activity.conversation.id,
        kind = %activity.kind,
        channel = %activity.channel_id,
        "Activity received"
    );

    match state.run_turn(activity).await {
        Ok(responses) => {
            record_request("messages", StatusCode::OK);
            Ok(Json(MessagesResponse { responses }))
        },
        Err(e) => {
            record_request("messages", e.status());
            Err(e)
        },
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let dispatcher = state.bot().dispatcher();
    let routing = dispatcher.routing();
    let classifier = dispatcher.classifier();
    let knowledge_base = dispatcher.knowledge_base();
    let settings = state.settings();

    let dispatch_ok = classifier.has_model(&routing.dispatch_model);
    let campus_ok = classifier.has_model(&routing.campus_model);

    let mut checks = serde_json::Map::new();
    checks.insert(
        "classifier".to_string(),
        serde_json::json!({
            "status": if dispatch_ok { "ok" } else { "missing_dispatch_model" },
            "backend": classifier.name(),
            "provider": settings.nlu.provider,
            "models": classifier.models(),
            "campus_model": if campus_ok { "ok" } else { "missing" },
        }),
    );
    checks.insert(
        "knowledge_base".to_string(),
        serde_json::json!({
            "status": "ok",
            "name": knowledge_base.name(),
            "provider": settings.knowledge.provider,
        }),
    );
    checks.insert(
        "persistence".to_string(),
        serde_json::json!({
            "status": "ok",
            "provider": settings.persistence.provider,
        }),
    );

    let (status, status_code) = if dispatch_ok {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "environment": settings.environment,
            "active_conversations": state.active_conversations(),
            "checks": checks,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use campus_bot_agent::{BotConfig, CampusBot};
    use campus_bot_config::Settings;
    use campus_bot_core::{StateKey, StateScope, StateStore, StoredRecord};
    use campus_bot_persistence::InMemoryStateStore;
    use campus_bot_rag::{
        KnowledgeBaseRegistry, KnowledgeFile, LocalKnowledgeBase, LocalKnowledgeConfig,
    };
    use campus_bot_text_processing::{PatternClassifier, PatternModelsFile};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const MODELS: &str = r#"
models:
  - name: Dispatch
    intents:
      - name: QnA
        patterns: ['\bhorario']
  - name: Campus
    intents: []
"#;

    const KNOWLEDGE: &str = r#"
entries:
  - id: horario
    questions: ["horario"]
    answer: "De 8:00 a 21:00."
"#;

    /// Store that takes its time to read and write
    #[derive(Default)]
    struct SlowStore {
        inner: InMemoryStateStore,
        read_delay: Duration,
        write_delay: Duration,
    }

    #[async_trait]
    impl StateStore for SlowStore {
        async fn read(&self, key: &StateKey) -> campus_bot_core::Result<Option<StoredRecord>> {
            tokio::time::sleep(self.read_delay).await;
            self.inner.read(key).await
        }

        async fn write(
            &self,
            key: &StateKey,
            data: serde_json::Value,
            expected_version: Option<u64>,
        ) -> campus_bot_core::Result<u64> {
            tokio::time::sleep(self.write_delay).await;
            self.inner.write(key, data, expected_version).await
        }

        async fn delete(&self, key: &StateKey) -> campus_bot_core::Result<()> {
            self.inner.delete(key).await
        }
    }

    fn app_state(store: Arc<dyn StateStore>, turn_timeout_ms: u64) -> AppState {
        let models: PatternModelsFile = serde_yaml::from_str(MODELS).unwrap();
        let classifier = PatternClassifier::from_models(&models.models).unwrap();

        let knowledge: KnowledgeFile = serde_yaml::from_str(KNOWLEDGE).unwrap();
        let registry = KnowledgeBaseRegistry::new();
        registry.register(Arc::new(LocalKnowledgeBase::new(
            LocalKnowledgeConfig::default(),
            knowledge.entries,
        )));

        let mut settings = Settings::default();
        settings.server.turn_timeout_ms = turn_timeout_ms;
        let bot = CampusBot::new(
            BotConfig::from_settings(&settings),
            Arc::new(classifier),
            &registry,
            store,
        )
        .unwrap();
        AppState::new(Arc::new(bot), settings, None)
    }

    fn post(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn message(conversation: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "message",
            "text": text,
            "from": { "id": "u1", "name": "Ana" },
            "recipient": { "id": "bot", "name": "Bot" },
            "conversation": { "id": conversation },
            "channelId": "webchat"
        })
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_message_returns_responses_in_order() {
        let app = create_router(app_state(Arc::new(InMemoryStateStore::new()), 5_000));

        let response = app.oneshot(post(message("c1", "hola"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["responses"],
            serde_json::json!(["Let's get started.", "What is your name?"])
        );
    }

    #[tokio::test]
    async fn test_conversation_update_welcomes() {
        let store = Arc::new(InMemoryStateStore::new());
        let app = create_router(app_state(store.clone(), 5_000));

        let activity = serde_json::json!({
            "type": "conversationUpdate",
            "recipient": { "id": "bot", "name": "Bot" },
            "conversation": { "id": "c1" },
            "membersAdded": [
                { "id": "bot", "name": "Bot" },
                { "id": "u1", "name": "Ana" }
            ]
        });
        let response = app.oneshot(post(activity)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let responses = body["responses"].as_array().unwrap();
        assert_eq!(responses.len(), 1);
        assert!(responses[0].as_str().unwrap().starts_with("Welcome, Ana."));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_conversation_is_rejected() {
        let app = create_router(app_state(Arc::new(InMemoryStateStore::new()), 5_000));

        let response = app.oneshot(post(message("", "hola"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_client_error() {
        let app = create_router(app_state(Arc::new(InMemoryStateStore::new()), 5_000));

        let request = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_slow_turn_times_out_without_writing() {
        let store = Arc::new(SlowStore {
            read_delay: Duration::from_millis(200),
            ..Default::default()
        });
        let app = create_router(app_state(store.clone(), 20));

        let response = app.oneshot(post(message("c1", "hola"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_while_saving_commits_whole_turn() {
        let store = Arc::new(SlowStore {
            write_delay: Duration::from_millis(100),
            ..Default::default()
        });
        let state = app_state(store.clone(), 50);
        let app = create_router(state);

        let started = app.clone().oneshot(post(message("c1", "hola"))).await.unwrap();
        assert_eq!(started.status(), StatusCode::OK);

        let named = app.oneshot(post(message("c1", "Ana"))).await.unwrap();
        assert_eq!(named.status(), StatusCode::OK);
        assert_eq!(
            json_body(named).await["responses"],
            serde_json::json!(["Hi Ana.", "How old are you?"])
        );

        let user = StateKey::new(StateScope::User, "webchat/users/u1");
        let record = store.inner.read(&user).await.unwrap().unwrap();
        assert_eq!(record.data["slots"]["name"]["value"], "Ana");

        let conversation = StateKey::new(StateScope::Conversation, "webchat/conversations/c1");
        let record = store.inner.read(&conversation).await.unwrap().unwrap();
        assert_eq!(record.version, 2);
    }

    #[tokio::test]
    async fn test_same_conversation_turns_are_serialized() {
        let state = app_state(Arc::new(InMemoryStateStore::new()), 5_000);
        let app = create_router(state.clone());

        let first = app.clone().oneshot(post(message("c1", "hola")));
        let second = app.oneshot(post(message("c1", "Ana")));
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);
        assert_eq!(state.active_conversations(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_adapters() {
        let app = create_router(app_state(Arc::new(InMemoryStateStore::new()), 5_000));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["knowledge_base"]["name"], "campus-faq");
        assert_eq!(body["checks"]["classifier"]["backend"], "pattern");
        assert_eq!(body["checks"]["persistence"]["provider"], "memory");
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let app = create_router(app_state(Arc::new(InMemoryStateStore::new()), 5_000));

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
