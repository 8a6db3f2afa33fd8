//! Knowledge-Base Routing

use campus_bot_core::knowledge::top_candidate;

use super::TurnDispatcher;
use crate::context::TurnContext;
use crate::AgentError;

/// What to do with the answer once found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Send the answer, or "didn't understand" when there is none
    Reply,
    /// Hand the answer back to the caller and stay silent on a miss
    Quiet,
}

/// Outcome of a knowledge lookup
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeAnswer {
    /// Empty query; the knowledge base was not called
    Skipped,
    /// Top answer carried the reset marker; the flow was re-armed
    Reset,
    /// No candidates (or the lookup failed)
    NotFound,
    /// Top answer text
    Answer(String),
}

impl TurnDispatcher {
    /// Look up `query` and act on the top candidate
    pub async fn route_to_knowledge_base(
        &self,
        ctx: &mut TurnContext<'_>,
        query: &str,
        delivery: Delivery,
    ) -> Result<KnowledgeAnswer, AgentError> {
        if query.trim().is_empty() {
            return Ok(KnowledgeAnswer::Skipped);
        }
        ctx.ensure_active()?;

        let candidates = match self.knowledge.lookup(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    knowledge_base = %self.knowledge.name(),
                    error = %e,
                    "Knowledge lookup failed"
                );
                Vec::new()
            },
        };

        let Some(top) = top_candidate(&candidates) else {
            if delivery == Delivery::Reply {
                ctx.send(self.messages.didnt_understand.clone()).await?;
            }
            return Ok(KnowledgeAnswer::NotFound);
        };
        tracing::debug!(
            score = top.score,
            source = top.source.as_deref().unwrap_or(""),
            "Top knowledge answer"
        );

        if top.is_directive(&self.routing.reset_marker) {
            tracing::info!(
                conversation_id = %ctx.activity().conversation.id,
                "Reset directive, dialog re-armed"
            );
            ctx.flow.rearm();
            return Ok(KnowledgeAnswer::Reset);
        }

        let text = top.text.clone();
        if delivery == Delivery::Reply {
            ctx.send(text.clone()).await?;
        }
        Ok(KnowledgeAnswer::Answer(text))
    }
}
