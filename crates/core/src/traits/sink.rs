//! Outbound message sink

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

/// Ordered outbound channel for the current turn
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send one text message to the user
    async fn send(&self, text: &str) -> Result<()>;
}

/// Sink that buffers messages in send order
///
/// Used by the HTTP surface (messages are returned in the response body) and
/// by tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Drain buffered messages
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

#[async_trait]
impl MessageSink for CollectingSink {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}
