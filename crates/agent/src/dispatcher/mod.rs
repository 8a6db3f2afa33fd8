//! Turn Dispatcher
//!
//! Top-level decision for one inbound activity:
//!
//! 1. Members added: one welcome line per added user (the bot excluded)
//! 2. Message:
//!    - flow not complete: the whole turn goes to the dialog engine
//!    - otherwise classify with the dispatch model and route on the top
//!      intent: `None` label, `QnA` label, or a domain model named by the
//!      label up to the first separator
//! 3. Anything else: acknowledge the event type
//!
//! Classifier and knowledge failures end here as a fallback message. Only
//! cancellation escapes.

mod domain;
mod knowledge;

pub use domain::select_substitution_entity;
pub use knowledge::{Delivery, KnowledgeAnswer};

use std::sync::Arc;

use campus_bot_config::{MessagesConfig, RoutingConfig};
use campus_bot_core::{ActivityKind, IntentClassifier, KnowledgeBase};

use crate::context::TurnContext;
use crate::dialog::{DialogEngine, StepOutcome};
use crate::AgentError;

/// Branch a turn was routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Members-added greeting
    Welcome,
    /// Slot-filling dialog step
    Dialog,
    /// Classifier failed or returned nothing
    UnknownIntent,
    /// Reserved "none" intent
    NoneIntent,
    /// Reserved QnA intent
    KnowledgeBase,
    /// Domain model named by the top intent
    DomainModel(String),
    /// Unhandled activity type
    Event(String),
    /// Nothing to do (a response was already produced)
    Skipped,
}

impl Route {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Route::Welcome => "welcome",
            Route::Dialog => "dialog",
            Route::UnknownIntent => "unknown_intent",
            Route::NoneIntent => "none",
            Route::KnowledgeBase => "knowledge_base",
            Route::DomainModel(_) => "domain_model",
            Route::Event(_) => "event",
            Route::Skipped => "skipped",
        }
    }
}

/// Per-turn routing logic over the configured collaborators
pub struct TurnDispatcher {
    classifier: Arc<dyn IntentClassifier>,
    knowledge: Arc<dyn KnowledgeBase>,
    engine: DialogEngine,
    routing: RoutingConfig,
    messages: MessagesConfig,
}

impl TurnDispatcher {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        knowledge: Arc<dyn KnowledgeBase>,
        engine: DialogEngine,
        routing: RoutingConfig,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            classifier,
            knowledge,
            engine,
            routing,
            messages,
        }
    }

    pub fn engine(&self) -> &DialogEngine {
        &self.engine
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn classifier(&self) -> &Arc<dyn IntentClassifier> {
        &self.classifier
    }

    pub fn knowledge_base(&self) -> &Arc<dyn KnowledgeBase> {
        &self.knowledge
    }

    /// Handle one turn; state changes are left in `ctx` for the caller
    pub async fn handle_turn(&self, ctx: &mut TurnContext<'_>) -> Result<Route, AgentError> {
        ctx.ensure_active()?;

        let route = match ctx.activity().kind.clone() {
            ActivityKind::ConversationUpdate => {
                self.welcome(ctx).await?;
                Route::Welcome
            },
            ActivityKind::Message if ctx.responded() => Route::Skipped,
            ActivityKind::Message if ctx.flow.is_active() => {
                self.run_dialog(ctx).await?;
                Route::Dialog
            },
            ActivityKind::Message => self.dispatch_to_top_intent(ctx).await?,
            ActivityKind::Other(kind) => {
                ctx.send(self.messages.event_detected_for(&kind)).await?;
                Route::Event(kind)
            },
        };

        metrics::counter!("bot_routes_total", "route" => route.label()).increment(1);
        tracing::debug!(
            conversation_id = %ctx.activity().conversation.id,
            route = route.label(),
            sent = ctx.sent().len(),
            "Turn routed"
        );
        Ok(route)
    }

    async fn welcome(&self, ctx: &mut TurnContext<'_>) -> Result<(), AgentError> {
        let lines: Vec<String> = ctx
            .activity()
            .added_users()
            .map(|member| {
                let name = if member.name.is_empty() {
                    &member.id
                } else {
                    &member.name
                };
                self.messages.welcome_for(name)
            })
            .collect();
        ctx.send_all(lines).await
    }

    async fn run_dialog(&self, ctx: &mut TurnContext<'_>) -> Result<(), AgentError> {
        let transition = self
            .engine
            .step(&ctx.flow, &ctx.slots, ctx.activity().text(), ctx.now());

        match &transition.outcome {
            StepOutcome::Retry { slot, failure } => {
                metrics::counter!("bot_validation_failures_total", "step" => slot.clone())
                    .increment(1);
                tracing::debug!(step = %slot, reason = %failure, "Dialog input rejected");
            },
            StepOutcome::Abandoned { slot } => {
                tracing::info!(
                    conversation_id = %ctx.activity().conversation.id,
                    step = %slot,
                    "Dialog abandoned after repeated failures"
                );
            },
            StepOutcome::Completed => {
                tracing::info!(
                    conversation_id = %ctx.activity().conversation.id,
                    "Dialog completed"
                );
            },
            StepOutcome::Started | StepOutcome::Advanced { .. } => {},
        }

        ctx.flow = transition.flow;
        ctx.slots = transition.slots;
        ctx.send_all(transition.messages).await
    }

    async fn dispatch_to_top_intent(&self, ctx: &mut TurnContext<'_>) -> Result<Route, AgentError> {
        ctx.ensure_active()?;
        let text = ctx.activity().text().to_string();

        let result = match self.classifier.classify(&self.routing.dispatch_model, &text).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    model = %self.routing.dispatch_model,
                    error = %e,
                    "Dispatch classification failed"
                );
                ctx.send(self.messages.unable_to_determine_intent.clone()).await?;
                return Ok(Route::UnknownIntent);
            },
        };

        let Some(top) = result.top_intent() else {
            ctx.send(self.messages.unable_to_determine_intent.clone()).await?;
            return Ok(Route::UnknownIntent);
        };
        tracing::debug!(intent = %top.name, score = top.score, "Top dispatch intent");

        if top.name == self.routing.none_intent {
            ctx.send(self.messages.didnt_understand.clone()).await?;
            return Ok(Route::NoneIntent);
        }

        if top.name == self.routing.qna_intent {
            self.route_to_knowledge_base(ctx, &text, Delivery::Reply)
                .await?;
            return Ok(Route::KnowledgeBase);
        }

        let model = self.routing.model_for_intent(&top.name).to_string();
        self.route_to_domain_model(ctx, &text, &model).await?;
        Ok(Route::DomainModel(model))
    }
}
