//! Campus bot turn runner
//!
//! Wires the dispatcher to the state store. One call to [`CampusBot::on_turn`]
//! is one turn:
//!
//! 1. Load the conversation record (flow state) and the user record (slots)
//! 2. Dispatch
//! 3. Persist both records, unless the turn was cancelled
//!
//! Cancellation is honored while loading and dispatching. Once persistence
//! starts it runs to completion: slots first, then the flow record, with the
//! slot write undone if the flow write fails.
//!
//! Callers must not run two turns of the same conversation at once.

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use campus_bot_config::{DialogConfig, MessagesConfig, RoutingConfig, Settings};
use campus_bot_core::{Activity, IntentClassifier, MessageSink, StateKey, StateScope, StateStore};
use campus_bot_persistence::ScopedState;
use campus_bot_rag::KnowledgeBaseRegistry;

use crate::context::TurnContext;
use crate::dialog::{CollectedSlots, DialogEngine, DialogFlowState};
use crate::dispatcher::{Route, TurnDispatcher};
use crate::AgentError;

/// Conversation-scope property holding the flow record
pub const FLOW_STATE_PROPERTY: &str = "dialog_state";
/// User-scope property holding the collected slots
pub const SLOTS_PROPERTY: &str = "slots";

/// Turn-logic configuration
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub routing: RoutingConfig,
    pub messages: MessagesConfig,
    pub dialog: DialogConfig,
}

impl BotConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            routing: settings.routing.clone(),
            messages: settings.messages.clone(),
            dialog: settings.dialog.clone(),
        }
    }
}

/// What a turn did
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub route: Route,
    /// Messages sent, in order
    pub messages: Vec<String>,
    /// Whether any state record was written
    pub state_saved: bool,
}

pub struct CampusBot {
    dispatcher: TurnDispatcher,
    store: Arc<dyn StateStore>,
}

impl CampusBot {
    /// Build the bot, refusing to start on missing collaborators
    ///
    /// # Errors
    /// `AgentError::Configuration` when the configuration is invalid, the
    /// knowledge base named by `routing.knowledge_base` is not registered, or
    /// the classifier does not serve the dispatch model.
    pub fn new(
        config: BotConfig,
        classifier: Arc<dyn IntentClassifier>,
        knowledge: &KnowledgeBaseRegistry,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, AgentError> {
        config.routing.validate()?;
        config.messages.validate()?;
        config.dialog.validate()?;

        let knowledge_base = knowledge.require(&config.routing.knowledge_base)?;

        if !classifier.has_model(&config.routing.dispatch_model) {
            return Err(AgentError::Configuration(format!(
                "classifier '{}' does not serve the dispatch model '{}'",
                classifier.name(),
                config.routing.dispatch_model
            )));
        }
        if !classifier.has_model(&config.routing.campus_model) {
            tracing::warn!(
                model = %config.routing.campus_model,
                "Classifier does not serve the campus model"
            );
        }

        tracing::info!(
            classifier = %classifier.name(),
            knowledge_base = %knowledge_base.name(),
            steps = config.dialog.steps.len(),
            "Campus bot ready"
        );

        Ok(Self {
            dispatcher: TurnDispatcher::new(
                classifier,
                knowledge_base,
                DialogEngine::new(config.dialog),
                config.routing,
                config.messages,
            ),
            store,
        })
    }

    pub fn dispatcher(&self) -> &TurnDispatcher {
        &self.dispatcher
    }

    /// Run one turn at the current local time
    pub async fn on_turn(
        &self,
        activity: &Activity,
        sink: &dyn MessageSink,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, AgentError> {
        self.on_turn_at(activity, sink, cancel, Local::now().naive_local())
            .await
    }

    /// Run one turn with an explicit reference instant
    pub async fn on_turn_at(
        &self,
        activity: &Activity,
        sink: &dyn MessageSink,
        cancel: &CancellationToken,
        now: NaiveDateTime,
    ) -> Result<TurnReport, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        metrics::counter!("bot_turns_total").increment(1);

        let (mut conversation, mut user) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            loaded = self.load_records(activity) => loaded?,
        };

        let flow = self
            .dispatcher
            .engine()
            .sanitize(conversation.get(FLOW_STATE_PROPERTY, DialogFlowState::default()));
        let slots = user.get(SLOTS_PROPERTY, CollectedSlots::default());

        let mut ctx = TurnContext::new(activity, sink, cancel, now).with_state(flow, slots);
        let route = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            route = self.dispatcher.handle_turn(&mut ctx) => Some(route?),
        };

        let route = match route {
            Some(route) if !cancel.is_cancelled() => route,
            _ => {
                tracing::info!(
                    conversation_id = %activity.conversation.id,
                    "Turn cancelled, state not saved"
                );
                return Err(AgentError::Cancelled);
            },
        };

        // Past this point the turn is committed; cancellation no longer applies
        if ctx.flow == DialogFlowState::default() {
            conversation.remove(FLOW_STATE_PROPERTY);
        } else {
            conversation
                .set(FLOW_STATE_PROPERTY, &ctx.flow)
                .map_err(AgentError::State)?;
        }
        if ctx.slots.is_empty() {
            user.remove(SLOTS_PROPERTY);
        } else {
            user.set(SLOTS_PROPERTY, &ctx.slots)
                .map_err(AgentError::State)?;
        }

        let (conversation_saved, user_saved) = Self::commit(&mut conversation, &mut user).await?;

        Ok(TurnReport {
            route,
            messages: ctx.into_sent(),
            state_saved: conversation_saved || user_saved,
        })
    }

    async fn load_records(
        &self,
        activity: &Activity,
    ) -> Result<(ScopedState, ScopedState), AgentError> {
        let conversation = ScopedState::load(
            self.store.clone(),
            StateKey::new(StateScope::Conversation, activity.conversation_key()),
        )
        .await
        .map_err(AgentError::State)?;
        let user = ScopedState::load(
            self.store.clone(),
            StateKey::new(StateScope::User, activity.user_key()),
        )
        .await
        .map_err(AgentError::State)?;
        Ok((conversation, user))
    }

    /// Write slots before the flow record so the step never advances past
    /// unsaved slots. A failed flow write puts the user record back.
    async fn commit(
        conversation: &mut ScopedState,
        user: &mut ScopedState,
    ) -> Result<(bool, bool), AgentError> {
        let user_saved = user.save_changes().await.map_err(AgentError::State)?;

        match conversation.save_changes().await {
            Ok(conversation_saved) => Ok((conversation_saved, user_saved)),
            Err(e) => {
                if let Err(undo) = user.undo_save().await {
                    tracing::error!(
                        key = %user.key(),
                        error = %undo,
                        "Failed to undo user state after flow write failure"
                    );
                }
                Err(AgentError::State(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{intents, now, ScriptedClassifier, ScriptedKnowledge};
    use campus_bot_core::{AnswerCandidate, ChannelAccount, CollectingSink, CoreError};
    use campus_bot_persistence::InMemoryStateStore;

    fn registry(knowledge: ScriptedKnowledge) -> KnowledgeBaseRegistry {
        let registry = KnowledgeBaseRegistry::new();
        registry.register(Arc::new(knowledge));
        registry
    }

    fn bot(store: Arc<dyn StateStore>) -> CampusBot {
        let classifier = ScriptedClassifier::default()
            .with("Dispatch", intents(&[("QnA", 0.9)]));
        let knowledge = ScriptedKnowledge::default()
            .with("reservar", vec![AnswerCandidate::new("#@$RESET#$@", 1.0)]);
        CampusBot::new(
            BotConfig::default(),
            Arc::new(classifier),
            &registry(knowledge),
            store,
        )
        .unwrap()
    }

    fn message(text: &str) -> Activity {
        Activity::message("c1", ChannelAccount::new("u1", "Ana"), text)
    }

    #[test]
    fn test_missing_knowledge_base_is_fatal() {
        let result = CampusBot::new(
            BotConfig::default(),
            Arc::new(ScriptedClassifier::default().with("Dispatch", intents(&[]))),
            &KnowledgeBaseRegistry::new(),
            Arc::new(InMemoryStateStore::new()),
        );
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_missing_dispatch_model_is_fatal() {
        let result = CampusBot::new(
            BotConfig::default(),
            Arc::new(ScriptedClassifier::default()),
            &registry(ScriptedKnowledge::default()),
            Arc::new(InMemoryStateStore::new()),
        );
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_invalid_dialog_is_fatal() {
        let mut config = BotConfig::default();
        config.dialog.steps.clear();
        let result = CampusBot::new(
            config,
            Arc::new(ScriptedClassifier::default().with("Dispatch", intents(&[]))),
            &registry(ScriptedKnowledge::default()),
            Arc::new(InMemoryStateStore::new()),
        );
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_state_carries_across_turns() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let bot = bot(store.clone());
        let sink = CollectingSink::new();
        let cancel = CancellationToken::new();

        let first = bot.on_turn_at(&message("hola"), &sink, &cancel, now()).await.unwrap();
        assert_eq!(first.route, Route::Dialog);
        assert!(first.state_saved);

        let second = bot.on_turn_at(&message("Ana"), &sink, &cancel, now()).await.unwrap();
        assert_eq!(second.messages, vec!["Hi Ana.", "How old are you?"]);

        let user_key = StateKey::new(StateScope::User, "test/users/u1");
        let record = store.read(&user_key).await.unwrap().unwrap();
        assert_eq!(record.data["slots"]["name"]["value"], "Ana");
    }

    #[tokio::test]
    async fn test_cancelled_turn_writes_nothing() {
        let store = Arc::new(InMemoryStateStore::new());
        let bot = bot(store.clone());
        let sink = CollectingSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = bot.on_turn_at(&message("hola"), &sink, &cancel, now()).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(store.is_empty());
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_welcome_turn_writes_nothing() {
        let store = Arc::new(InMemoryStateStore::new());
        let bot = bot(store.clone());
        let sink = CollectingSink::new();
        let activity = Activity::members_added(
            "c1",
            ChannelAccount::new("bot", "Bot"),
            vec![ChannelAccount::new("u1", "Ana")],
        );

        let report = bot
            .on_turn_at(&activity, &sink, &CancellationToken::new(), now())
            .await
            .unwrap();
        assert_eq!(report.route, Route::Welcome);
        assert!(!report.state_saved);
        assert!(store.is_empty());
    }

    /// In-memory store that rejects writes to one scope while armed
    #[derive(Default)]
    struct FailingStore {
        inner: InMemoryStateStore,
        failing: std::sync::Mutex<Option<StateScope>>,
    }

    impl FailingStore {
        fn fail(&self, scope: Option<StateScope>) {
            *self.failing.lock().unwrap() = scope;
        }
    }

    #[async_trait::async_trait]
    impl StateStore for FailingStore {
        async fn read(
            &self,
            key: &StateKey,
        ) -> Result<Option<campus_bot_core::StoredRecord>, CoreError> {
            self.inner.read(key).await
        }

        async fn write(
            &self,
            key: &StateKey,
            data: serde_json::Value,
            expected_version: Option<u64>,
        ) -> Result<u64, CoreError> {
            if *self.failing.lock().unwrap() == Some(key.scope) {
                return Err(CoreError::State(format!("{} unavailable", key)));
            }
            self.inner.write(key, data, expected_version).await
        }

        async fn delete(&self, key: &StateKey) -> Result<(), CoreError> {
            self.inner.delete(key).await
        }
    }

    async fn say(bot: &CampusBot, text: &str) -> Result<TurnReport, AgentError> {
        bot.on_turn_at(&message(text), &CollectingSink::new(), &CancellationToken::new(), now())
            .await
    }

    #[tokio::test]
    async fn test_failed_user_write_keeps_step() {
        let store = Arc::new(FailingStore::default());
        let bot = bot(store.clone());
        say(&bot, "hola").await.unwrap();

        store.fail(Some(StateScope::User));
        let failed = say(&bot, "Ana").await;
        assert!(matches!(failed, Err(AgentError::State(_))));

        store.fail(None);
        let retried = say(&bot, "Ana").await.unwrap();
        assert_eq!(retried.messages, vec!["Hi Ana.", "How old are you?"]);
    }

    #[tokio::test]
    async fn test_failed_flow_write_undoes_slots() {
        let store = Arc::new(FailingStore::default());
        let bot = bot(store.clone());
        say(&bot, "hola").await.unwrap();

        store.fail(Some(StateScope::Conversation));
        let failed = say(&bot, "Ana").await;
        assert!(matches!(failed, Err(AgentError::State(_))));

        let user_key = StateKey::new(StateScope::User, "test/users/u1");
        assert!(store.read(&user_key).await.unwrap().is_none());

        store.fail(None);
        let retried = say(&bot, "Luis").await.unwrap();
        assert_eq!(retried.messages, vec!["Hi Luis.", "How old are you?"]);
        let record = store.read(&user_key).await.unwrap().unwrap();
        assert_eq!(record.data["slots"]["name"]["value"], "Luis");
    }

    #[tokio::test]
    async fn test_cancel_during_dispatch_writes_nothing() {
        struct CancellingSink(CancellationToken);

        #[async_trait::async_trait]
        impl MessageSink for CancellingSink {
            async fn send(&self, _text: &str) -> Result<(), CoreError> {
                self.0.cancel();
                Ok(())
            }
        }

        let store = Arc::new(InMemoryStateStore::new());
        let bot = bot(store.clone());
        let cancel = CancellationToken::new();
        let sink = CancellingSink(cancel.clone());

        let result = bot.on_turn_at(&message("hola"), &sink, &cancel, now()).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_write_surfaces_as_state_error() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let bot = bot(store.clone());
        let key = StateKey::new(StateScope::Conversation, "test/conversations/c1");

        // Another instance writes between our load and save
        struct Racing {
            store: Arc<dyn StateStore>,
            key: StateKey,
        }
        #[async_trait::async_trait]
        impl MessageSink for Racing {
            async fn send(&self, _text: &str) -> Result<(), CoreError> {
                let _ = self.store.write(&self.key, serde_json::json!({}), None).await;
                Ok(())
            }
        }

        let sink = Racing {
            store: store.clone(),
            key,
        };
        let result = bot
            .on_turn_at(&message("hola"), &sink, &CancellationToken::new(), now())
            .await;
        assert!(matches!(
            result,
            Err(AgentError::State(CoreError::Conflict { .. }))
        ));
    }
}
