#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use campus_bot_agent::{BotConfig, CampusBot, TurnReport};
use campus_bot_core::{Activity, ChannelAccount, CollectingSink, StateStore};
use campus_bot_rag::{
    KnowledgeBaseRegistry, KnowledgeFile, KnowledgeLoader, LocalKnowledgeBase, LocalKnowledgeConfig,
};
use campus_bot_text_processing::{PatternClassifier, PatternModelsFile};

pub const MODELS: &str = r#"
version: "1.0"
models:
  - name: Dispatch
    intents:
      - name: QnA
        patterns: ['\bhorario', '\bbiblioteca', '\breserv']
      - name: Campus_info
        score: 0.8
        patterns: ['\bcampus\b', '\bsede\b']
  - name: Campus
    intents:
      - name: Información_general
        patterns: ['\binformacion\b', '\binfo\b']
      - name: Transporte
        score: 0.7
        patterns: ['\bautobus', '\bllegar\b']
    entities:
      - entity_type: campus
        pattern: '\b(campus)\b'
      - entity_type: campus_name
        pattern: '\b(norte|sur)\b'
"#;

pub const KNOWLEDGE: &str = r##"
version: "1.0"
entries:
  - id: biblioteca
    questions: ["¿Cuál es el horario de la biblioteca?", "horario biblioteca"]
    answer: "La biblioteca abre de lunes a viernes de 8:00 a 21:00."
  - id: reserva
    questions: ["quiero reservar", "reservar"]
    answer: "#@$RESET#$@"
  - id: informacion_general
    questions: ["Información_general"]
    answer: "Bienvenido al $campus. Más información sobre el campus @campus en la web."
  - id: transporte
    questions: ["Transporte"]
    answer: "Las líneas 1 y 4 paran en la entrada principal."
"##;

/// 2018-11-13 10:00, a Tuesday
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 11, 13)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn classifier() -> Arc<PatternClassifier> {
    let file: PatternModelsFile = serde_yaml::from_str(MODELS).unwrap();
    Arc::new(PatternClassifier::from_models(&file.models).unwrap())
}

pub fn registry() -> KnowledgeBaseRegistry {
    let file: KnowledgeFile = serde_yaml::from_str(KNOWLEDGE).unwrap();
    let registry = KnowledgeBaseRegistry::new();
    registry.register(Arc::new(LocalKnowledgeBase::new(
        LocalKnowledgeConfig::default(),
        file.entries,
    )));
    registry
}

pub fn bot(config: BotConfig, store: Arc<dyn StateStore>) -> CampusBot {
    CampusBot::new(config, classifier(), &registry(), store).unwrap()
}

/// Bot over the data files under `config/`
pub fn shipped_bot(store: Arc<dyn StateStore>) -> CampusBot {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config");
    let classifier = PatternClassifier::from_file(&root.join("nlu/models.yaml")).unwrap();
    let entries = KnowledgeLoader::load_path(&root.join("knowledge/campus.yaml")).unwrap();

    let registry = KnowledgeBaseRegistry::new();
    registry.register(Arc::new(LocalKnowledgeBase::new(
        LocalKnowledgeConfig::default(),
        entries,
    )));
    CampusBot::new(BotConfig::default(), Arc::new(classifier), &registry, store).unwrap()
}

/// One user talking to one bot in one conversation
pub struct Conversation<'a> {
    pub bot: &'a CampusBot,
    pub conversation_id: String,
    pub user: ChannelAccount,
}

impl<'a> Conversation<'a> {
    pub fn new(bot: &'a CampusBot, conversation_id: &str) -> Self {
        Self {
            bot,
            conversation_id: conversation_id.to_string(),
            user: ChannelAccount::new("u1", "Ana"),
        }
    }

    pub async fn say(&self, text: &str) -> TurnReport {
        let activity = Activity::message(&self.conversation_id, self.user.clone(), text);
        let sink = CollectingSink::new();
        let report = self
            .bot
            .on_turn_at(&activity, &sink, &CancellationToken::new(), now())
            .await
            .unwrap();
        assert_eq!(sink.messages(), report.messages);
        report
    }

    pub async fn join(&self) -> TurnReport {
        let activity = Activity::members_added(
            &self.conversation_id,
            ChannelAccount::new("bot", "Bot"),
            vec![self.user.clone()],
        );
        self.bot
            .on_turn_at(&activity, &CollectingSink::new(), &CancellationToken::new(), now())
            .await
            .unwrap()
    }
}
