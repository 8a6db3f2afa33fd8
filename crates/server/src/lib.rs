//! Campus Bot Server
//!
//! Provides the HTTP channel endpoint, health check and Prometheus metrics
//! for the campus bot.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, record_request, record_turn_latency};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_bot_agent::AgentError;
use campus_bot_core::CoreError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Turn timed out after {0} ms")]
    Timeout(u64),

    #[error("Turn cancelled")]
    Cancelled,

    /// Another instance wrote the same conversation concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::State(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Timeout(_) => "timeout",
            ServerError::Cancelled => "cancelled",
            ServerError::Conflict(_) => "conflict",
            ServerError::State(_) => "state",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Cancelled => ServerError::Cancelled,
            AgentError::State(e @ CoreError::Conflict { .. }) => {
                ServerError::Conflict(e.to_string())
            },
            AgentError::State(e) => ServerError::State(e.to_string()),
            AgentError::Configuration(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Turn failed");
        } else {
            tracing::warn!(error = %self, "Turn rejected");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
