//! End-to-end turns through the pattern classifier, the local knowledge
//! base and both state stores.

mod common;

use std::sync::Arc;

use campus_bot_agent::{BotConfig, Route};
use campus_bot_core::{StateKey, StateScope, StateStore};
use campus_bot_persistence::{FileStateStore, InMemoryStateStore};

use common::{bot, Conversation};

async fn complete_booking(conversation: &Conversation<'_>) {
    for input in ["hola", "Ana", "twenty", "tomorrow at 9pm"] {
        assert_eq!(conversation.say(input).await.route, Route::Dialog);
    }
}

#[tokio::test]
async fn test_booking_then_questions() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");

    let start = conversation.say("hola").await;
    assert_eq!(start.messages, vec!["Let's get started.", "What is your name?"]);

    let name = conversation.say("Ana").await;
    assert_eq!(name.messages, vec!["Hi Ana.", "How old are you?"]);

    let age = conversation.say("twenty").await;
    assert_eq!(age.messages, vec!["I have your age as 20.", "When is your flight?"]);

    let date = conversation.say("tomorrow at 9pm").await;
    assert_eq!(
        date.messages,
        vec![
            "Your cab ride to the airport is scheduled for 2018-11-14 21:00.",
            "Thanks for completing the booking Ana.",
            "Type anything to run the bot again.",
        ]
    );

    let question = conversation.say("¿Cuál es el horario de la biblioteca?").await;
    assert_eq!(question.route, Route::KnowledgeBase);
    assert_eq!(
        question.messages,
        vec!["La biblioteca abre de lunes a viernes de 8:00 a 21:00."]
    );
}

#[tokio::test]
async fn test_invalid_age_keeps_step() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    conversation.say("hola").await;
    conversation.say("Ana").await;

    for input in ["abc", "17", "200"] {
        let report = conversation.say(input).await;
        assert_eq!(report.route, Route::Dialog);
        assert_eq!(report.messages, vec!["Please enter an age between 18 and 120."]);
    }

    let accepted = conversation.say("45").await;
    assert_eq!(accepted.messages, vec!["I have your age as 45.", "When is your flight?"]);
}

#[tokio::test]
async fn test_unrecognized_utterance_after_booking() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    complete_booking(&conversation).await;

    let report = conversation.say("asdf qwerty").await;
    assert_eq!(report.route, Route::NoneIntent);
    assert_eq!(report.messages, vec!["Perdón, no te he entendido."]);
}

#[tokio::test]
async fn test_reset_directive_restarts_dialog() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    complete_booking(&conversation).await;

    let reset = conversation.say("quiero reservar").await;
    assert_eq!(reset.route, Route::KnowledgeBase);
    assert!(reset.messages.is_empty());
    assert!(reset.state_saved);

    let restarted = conversation.say("vale").await;
    assert_eq!(restarted.route, Route::Dialog);
    assert_eq!(
        restarted.messages,
        vec!["Let's get started.", "What is your name?"]
    );
}

#[tokio::test]
async fn test_campus_information_template() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    complete_booking(&conversation).await;

    let report = conversation.say("Información del campus NORTE").await;
    assert_eq!(report.route, Route::DomainModel("Campus".to_string()));
    assert_eq!(
        report.messages,
        vec!["Bienvenido al Norte. Más información sobre el campus norte en la web."]
    );

    let too_few = conversation.say("info del campus").await;
    assert_eq!(too_few.messages, vec!["Perdón, no te he entendido."]);
}

#[tokio::test]
async fn test_campus_intent_answered_by_name() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    complete_booking(&conversation).await;

    let report = conversation.say("¿Cómo llegar al campus en autobús?").await;
    assert_eq!(report.route, Route::DomainModel("Campus".to_string()));
    assert_eq!(
        report.messages,
        vec!["Las líneas 1 y 4 paran en la entrada principal."]
    );
}

#[tokio::test]
async fn test_welcome_on_join() {
    let store = Arc::new(InMemoryStateStore::new());
    let bot = bot(BotConfig::default(), store.clone());
    let conversation = Conversation::new(&bot, "c1");

    let report = conversation.join().await;
    assert_eq!(report.route, Route::Welcome);
    assert_eq!(
        report.messages,
        vec!["Welcome, Ana. Soy el asistente del campus. Pregúntame por horarios, servicios o sedes."]
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_retry_ceiling_returns_to_questions() {
    let mut config = BotConfig::default();
    config.dialog.max_attempts = Some(2);
    let bot = bot(config, Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    conversation.say("hola").await;
    conversation.say("Ana").await;

    conversation.say("abc").await;
    let abandoned = conversation.say("abc").await;
    assert_eq!(
        abandoned.messages,
        vec!["Let's leave it here for now. Ask me anything about the campus."]
    );

    let question = conversation.say("horario biblioteca").await;
    assert_eq!(question.route, Route::KnowledgeBase);
}

#[tokio::test]
async fn test_conversations_are_independent() {
    let bot = bot(BotConfig::default(), Arc::new(InMemoryStateStore::new()));
    let first = Conversation::new(&bot, "c1");
    let mut second = Conversation::new(&bot, "c2");
    second.user = campus_bot_core::ChannelAccount::new("u2", "Luis");

    first.say("hola").await;
    second.say("hola").await;
    first.say("Ana").await;

    let report = second.say("Luis").await;
    assert_eq!(report.messages, vec!["Hi Luis.", "How old are you?"]);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(dir.path()).unwrap());
        let bot = bot(BotConfig::default(), store);
        let conversation = Conversation::new(&bot, "c1");
        conversation.say("hola").await;
        conversation.say("Ana").await;
    }

    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(dir.path()).unwrap());
    let user = store
        .read(&StateKey::new(StateScope::User, "test/users/u1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.data["slots"]["name"]["value"], "Ana");

    let bot = bot(BotConfig::default(), store);
    let conversation = Conversation::new(&bot, "c1");
    let report = conversation.say("25").await;
    assert_eq!(report.messages, vec!["I have your age as 25.", "When is your flight?"]);
}

#[tokio::test]
async fn test_shipped_data_files() {
    let bot = common::shipped_bot(Arc::new(InMemoryStateStore::new()));
    let conversation = Conversation::new(&bot, "c1");
    complete_booking(&conversation).await;

    let hours = conversation.say("horario biblioteca").await;
    assert_eq!(hours.route, Route::KnowledgeBase);
    assert!(hours.messages[0].starts_with("La biblioteca abre"));

    let campus = conversation.say("Información de la sede Sur").await;
    assert_eq!(campus.route, Route::DomainModel("Campus".to_string()));
    assert_eq!(
        campus.messages,
        vec!["Bienvenido al Sur. Encontrarás toda la información sobre el campus sur en la web de la universidad."]
    );

    let reset = conversation.say("quiero reservar").await;
    assert!(reset.messages.is_empty());
    assert_eq!(conversation.say("hola").await.messages[1], "What is your name?");
}
