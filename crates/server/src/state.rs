//! Application State
//!
//! Shared state across all handlers.

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use campus_bot_agent::{AgentError, CampusBot};
use campus_bot_config::Settings;
use campus_bot_core::{Activity, CollectingSink};

use crate::metrics::record_turn_latency;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    bot: Arc<CampusBot>,
    settings: Arc<Settings>,
    /// One lock per conversation id with a turn in flight
    conversations: Arc<DashMap<String, Arc<Mutex<()>>>>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(bot: Arc<CampusBot>, settings: Settings, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            bot,
            settings: Arc::new(settings),
            conversations: Arc::new(DashMap::new()),
            metrics,
        }
    }

    pub fn bot(&self) -> &CampusBot {
        &self.bot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.server.turn_timeout_ms)
    }

    /// Conversations with a turn running or waiting
    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }

    /// Run one turn and return the messages it sent
    ///
    /// Turns of the same conversation run one at a time. A turn that exceeds
    /// the configured timeout before it starts saving is cancelled and writes
    /// no state.
    pub async fn run_turn(&self, activity: Activity) -> Result<Vec<String>, ServerError> {
        let conversation_id = activity.conversation.id.clone();
        if conversation_id.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "conversation.id is required".to_string(),
            ));
        }

        let started = Instant::now();
        let lock = self
            .conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.run_locked(&activity).await
        };

        drop(lock);
        self.conversations
            .remove_if(&conversation_id, |_, lock| Arc::strong_count(lock) == 1);

        record_turn_latency(started.elapsed().as_secs_f64());
        result
    }

    async fn run_locked(&self, activity: &Activity) -> Result<Vec<String>, ServerError> {
        let sink = CollectingSink::new();
        let cancel = CancellationToken::new();
        let timeout = self.turn_timeout();

        // The bot stops at the token while loading or dispatching, but a turn
        // already persisting state is awaited to completion.
        let turn = self.bot.on_turn(activity, &sink, &cancel);
        tokio::pin!(turn);
        let (result, timed_out) = tokio::select! {
            result = &mut turn => (result, false),
            _ = tokio::time::sleep(timeout) => {
                cancel.cancel();
                (turn.await, true)
            },
        };

        match result {
            Ok(report) => {
                if timed_out {
                    tracing::warn!(
                        conversation_id = %activity.conversation.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Turn finished saving state after timeout"
                    );
                }
                tracing::debug!(
                    conversation_id = %activity.conversation.id,
                    route = %report.route.label(),
                    messages = report.messages.len(),
                    state_saved = report.state_saved,
                    "Turn complete"
                );
                Ok(report.messages)
            },
            Err(AgentError::Cancelled) if timed_out => {
                tracing::warn!(
                    conversation_id = %activity.conversation.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Turn timed out"
                );
                Err(ServerError::Timeout(timeout.as_millis() as u64))
            },
            Err(e) => Err(e.into()),
        }
    }
}
