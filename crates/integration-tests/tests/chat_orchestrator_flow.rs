mod support;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serial_test::serial;
use shared::chat_orchestrator::{ChatError, ChatOrchestrator, ChatTurnInput};
use shared::llm::{
    ChatCompletionRequest, ChatCompletionResponse, ChatGateway, ChatGatewayFuture,
    KNOWLEDGE_CONTEXT_LEAD_IN, ModelListFuture,
};
use shared::models::{AssistantConfigDraft, ChatRole};
use shared::repos::Store;
use shared::study_plan::StudyPlanOutcome;
use uuid::Uuid;

struct RecordingGateway {
    requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
    reply_content: String,
}

impl RecordingGateway {
    fn new(reply_content: &str) -> (Arc<Self>, Arc<Mutex<Vec<ChatCompletionRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let gateway = Arc::new(Self {
            requests: requests.clone(),
            reply_content: reply_content.to_string(),
        });
        (gateway, requests)
    }
}

impl ChatGateway for RecordingGateway {
    fn chat_completion<'a>(&'a self, request: ChatCompletionRequest) -> ChatGatewayFuture<'a> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("request log should lock")
                .push(request);
            Ok(ChatCompletionResponse {
                content: self.reply_content.clone(),
                model: "mock-model".to_string(),
                total_tokens: 7,
            })
        })
    }

    fn list_models<'a>(&'a self) -> ModelListFuture<'a> {
        Box::pin(async move { Ok(vec!["mock-model".to_string()]) })
    }
}

fn orchestrator_with(store: Store, gateway: Arc<RecordingGateway>) -> ChatOrchestrator {
    ChatOrchestrator::new(store, gateway.clone(), gateway, 30_000, 60_000)
}

async fn seed_default_config(store: &Store, user_id: Uuid) {
    let draft = AssistantConfigDraft {
        name: "Daily helper".to_string(),
        description: None,
        system_prompt: "You are concise.".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        temperature: "0.7".to_string(),
        max_tokens: 2000,
        top_p: "1".to_string(),
        frequency_penalty: "0".to_string(),
        presence_penalty: "0".to_string(),
        icon: "🤖".to_string(),
        is_default: true,
        is_active: true,
        provider_override: None,
    };
    store
        .create_assistant_config(user_id, &draft)
        .await
        .expect("default config should create");
}

async fn seed_diary_entry(store: &Store, user_id: Uuid, title: &str) {
    sqlx::query(
        "INSERT INTO diary_entries (id, user_id, title, content, entry_date)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind("walked along the water before work")
    .bind(Utc::now().date_naive())
    .execute(store.pool())
    .await
    .expect("diary entry should insert");
}

fn chat_input(message: &str, session_id: Option<&str>, use_knowledge: bool) -> ChatTurnInput {
    ChatTurnInput {
        message: message.to_string(),
        session_id: session_id.map(ToString::to_string),
        config_id: None,
        use_knowledge,
    }
}

#[tokio::test]
#[serial]
async fn knowledge_toggle_controls_personalization() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;
    seed_default_config(&store, user_id).await;
    seed_diary_entry(&store, user_id, "Harbor walk").await;

    let (gateway, requests) = RecordingGateway::new("Sounds lovely.");
    let orchestrator = orchestrator_with(store, gateway);

    orchestrator
        .run_turn(user_id, chat_input("How was my week?", None, true))
        .await
        .expect("personalized turn should succeed");
    orchestrator
        .run_turn(user_id, chat_input("How was my week?", None, false))
        .await
        .expect("unpersonalized turn should succeed");

    let requests = requests.lock().expect("request log should lock");
    assert_eq!(requests.len(), 2);

    let personalized_system = &requests[0].messages[0];
    assert_eq!(personalized_system.role, ChatRole::System);
    assert!(personalized_system.content.contains(KNOWLEDGE_CONTEXT_LEAD_IN));
    assert!(personalized_system.content.contains("Harbor walk"));

    let plain_system = &requests[1].messages[0];
    assert_eq!(plain_system.role, ChatRole::System);
    assert!(!plain_system.content.contains(KNOWLEDGE_CONTEXT_LEAD_IN));
    assert!(!plain_system.content.contains("Harbor walk"));
    assert_eq!(plain_system.content, "You are concise.");
}

#[tokio::test]
#[serial]
async fn turn_persists_user_and_assistant_rows_and_reuses_sessions() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;
    seed_default_config(&store, user_id).await;

    let (gateway, requests) = RecordingGateway::new("Hi there.");
    let orchestrator = orchestrator_with(store.clone(), gateway);

    let outcome = orchestrator
        .run_turn(user_id, chat_input("Hello", None, false))
        .await
        .expect("first turn should succeed");
    assert!(!outcome.session_id.trim().is_empty());
    assert_eq!(outcome.tokens_used, 7);
    assert_eq!(outcome.model, "mock-model");

    let history = store
        .session_history(user_id, &outcome.session_id)
        .await
        .expect("history should load");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[0].tokens_used, 0);
    assert!(history[0].model.is_none());
    assert_eq!(history[1].role, ChatRole::Assistant);
    assert_eq!(history[1].content, "Hi there.");
    assert_eq!(history[1].model.as_deref(), Some("mock-model"));

    orchestrator
        .run_turn(
            user_id,
            chat_input("And again", Some(&outcome.session_id), false),
        )
        .await
        .expect("second turn should succeed");

    let requests = requests.lock().expect("request log should lock");
    // System message plus the three persisted turns visible at call time.
    assert_eq!(requests[1].messages.len(), 4);

    let history = store
        .session_history(user_id, &outcome.session_id)
        .await
        .expect("history should reload");
    assert_eq!(history.len(), 4);
}

#[tokio::test]
#[serial]
async fn run_turn_without_any_config_reports_missing_default() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;

    let (gateway, _) = RecordingGateway::new("unused");
    let orchestrator = orchestrator_with(store, gateway);

    let err = orchestrator
        .run_turn(user_id, chat_input("Hello", None, false))
        .await
        .expect_err("turn without configs should fail");
    assert!(matches!(err, ChatError::NoDefaultConfig));
}

#[tokio::test]
#[serial]
async fn study_plan_generation_parses_or_degrades() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;
    seed_default_config(&store, user_id).await;

    let (gateway, _) = RecordingGateway::new(
        r#"{"title":"Learn Rust","priority":"High","tasks":[{"title":"Ownership","duration":"2h"}]}"#,
    );
    let orchestrator = orchestrator_with(store.clone(), gateway);
    let outcome = orchestrator
        .generate_study_plan(user_id, "three week rust plan")
        .await
        .expect("plan generation should succeed");
    match outcome {
        StudyPlanOutcome::Success { plan, .. } => {
            assert_eq!(plan.title, "Learn Rust");
            assert_eq!(plan.tasks.len(), 1);
        }
        StudyPlanOutcome::ParseError { error, .. } => {
            panic!("expected parsed plan, got: {error}")
        }
    }

    let (gateway, _) = RecordingGateway::new("I would start with ownership, then borrowing.");
    let orchestrator = orchestrator_with(store, gateway);
    let outcome = orchestrator
        .generate_study_plan(user_id, "three week rust plan")
        .await
        .expect("degraded plan generation should still succeed");
    match outcome {
        StudyPlanOutcome::ParseError { raw_content, .. } => {
            assert_eq!(raw_content, "I would start with ownership, then borrowing.");
        }
        StudyPlanOutcome::Success { .. } => panic!("prose reply must not parse as a plan"),
    }
}
