//! Per-turn context
//!
//! Holds everything one turn reads and writes: the inbound activity, the
//! outbound sink, the cancellation token, and the two state records loaded
//! for the turn. The records are plain values here; the caller persists them
//! after the turn completes.

use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use campus_bot_core::{Activity, MessageSink};

use crate::dialog::{CollectedSlots, DialogFlowState};
use crate::AgentError;

pub struct TurnContext<'a> {
    activity: &'a Activity,
    sink: &'a dyn MessageSink,
    cancel: &'a CancellationToken,
    now: NaiveDateTime,
    sent: Vec<String>,
    /// Conversation-scoped flow record
    pub flow: DialogFlowState,
    /// User-scoped slot record
    pub slots: CollectedSlots,
}

impl<'a> TurnContext<'a> {
    pub fn new(
        activity: &'a Activity,
        sink: &'a dyn MessageSink,
        cancel: &'a CancellationToken,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            activity,
            sink,
            cancel,
            now,
            sent: Vec::new(),
            flow: DialogFlowState::default(),
            slots: CollectedSlots::default(),
        }
    }

    /// Attach the state records loaded for this turn
    pub fn with_state(mut self, flow: DialogFlowState, slots: CollectedSlots) -> Self {
        self.flow = flow;
        self.slots = slots;
        self
    }

    pub fn activity(&self) -> &Activity {
        self.activity
    }

    /// Reference instant for date validation
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Whether anything was sent this turn
    pub fn responded(&self) -> bool {
        !self.sent.is_empty()
    }

    /// Messages sent so far, in order
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn into_sent(self) -> Vec<String> {
        self.sent
    }

    /// Fail with `Cancelled` once the turn has been cancelled
    pub fn ensure_active(&self) -> Result<(), AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        Ok(())
    }

    /// Send one message
    ///
    /// Delivery failures are logged and the turn goes on; the message still
    /// counts as sent for ordering purposes.
    pub async fn send(&mut self, text: impl Into<String>) -> Result<(), AgentError> {
        self.ensure_active()?;
        let text = text.into();
        if let Err(e) = self.sink.send(&text).await {
            tracing::warn!(
                conversation_id = %self.activity.conversation.id,
                error = %e,
                "Failed to deliver message"
            );
        }
        self.sent.push(text);
        Ok(())
    }

    /// Send several messages in order
    pub async fn send_all<I, S>(&mut self, messages: I) -> Result<(), AgentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }
}
