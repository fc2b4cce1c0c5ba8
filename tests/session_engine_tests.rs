//! Session engine behavior tests
//!
//! These drive the full start -> answer -> complete lifecycle against the
//! in-memory store, including the failure paths a service layer depends on:
//! completed sessions staying immutable, persistence failures surfacing as
//! errors instead of phantom successes, and concurrent answers to one
//! session never losing an update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use vagvisare::session::{
    EngineError, InMemorySessionStore, Session, SessionEngine, SessionStore, StoreError,
};
use vagvisare::workflow::{Step, StepType, WorkflowCatalog, WorkflowDefinition};

fn step(id: &str, next: Option<&str>) -> Step {
    Step {
        id: id.to_string(),
        title: format!("Step {id}"),
        question: format!("Question for {id}?"),
        step_type: StepType::Text,
        options: None,
        next: next.map(str::to_string),
    }
}

fn workflow(id: &str, steps: Vec<Step>) -> WorkflowDefinition {
    WorkflowDefinition {
        id: id.to_string(),
        title: format!("Workflow {id}"),
        description: String::new(),
        steps,
    }
}

fn test_catalog() -> Arc<WorkflowCatalog> {
    Arc::new(WorkflowCatalog::from_definitions(vec![
        workflow("job_loss", vec![step("step1", None)]),
        workflow(
            "onboarding",
            vec![
                step("name", Some("start_date")),
                step("start_date", Some("notes")),
                step("notes", None),
            ],
        ),
    ]))
}

fn engine_with(store: Arc<dyn SessionStore>) -> SessionEngine {
    SessionEngine::new(test_catalog(), store)
}

fn engine() -> SessionEngine {
    engine_with(Arc::new(InMemorySessionStore::new()))
}

/// Store wrapper that fails the next update on demand, for exercising the
/// persistence-error path.
struct FlakyStore {
    inner: InMemorySessionStore,
    fail_next_update: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            fail_next_update: AtomicBool::new(false),
        }
    }

    fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        self.inner.create(session).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.get(session_id).await
    }

    async fn update(&self, session: Session) -> Result<Session, StoreError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        self.inner.update(session).await
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn start_unknown_workflow_fails_not_found() {
    let result = engine().start("does_not_exist").await;
    assert!(matches!(result, Err(EngineError::WorkflowNotFound(_))));
}

#[tokio::test]
async fn start_positions_session_at_first_step() {
    let session = engine().start("onboarding").await.unwrap();
    assert_eq!(session.workflow_id, "onboarding");
    assert_eq!(session.current_step_id.as_deref(), Some("name"));
    assert!(session.answers.is_empty());
    assert!(!session.is_complete);
    assert!(session.tasks.is_empty());
    assert!(session.warnings.is_empty());
}

#[tokio::test]
async fn started_session_is_persisted() {
    let engine = engine();
    let session = engine.start("onboarding").await.unwrap();
    let loaded = engine.get_session(&session.id).await.unwrap();
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.current_step_id.as_deref(), Some("name"));
}

#[tokio::test]
async fn three_step_workflow_completes_after_exactly_three_answers() {
    let engine = engine();
    let session = engine.start("onboarding").await.unwrap();

    let after_one = engine.answer(&session.id, "Kim").await.unwrap();
    assert!(!after_one.is_complete);
    assert_eq!(after_one.current_step_id.as_deref(), Some("start_date"));

    let after_two = engine.answer(&session.id, "2025-09-01").await.unwrap();
    assert!(!after_two.is_complete);
    assert_eq!(after_two.current_step_id.as_deref(), Some("notes"));

    let after_three = engine.answer(&session.id, "none").await.unwrap();
    assert!(after_three.is_complete);
    assert_eq!(after_three.current_step_id, None);
    assert_eq!(after_three.answers.len(), 3);
    assert_eq!(after_three.answers["name"], "Kim");
    assert_eq!(after_three.answers["start_date"], "2025-09-01");
    assert_eq!(after_three.answers["notes"], "none");
}

#[tokio::test]
async fn answer_on_unknown_session_fails_not_found() {
    let result = engine().answer("no-such-session", "hello").await;
    assert!(matches!(result, Err(EngineError::SessionNotFound(_))));
}

#[tokio::test]
async fn get_session_on_unknown_id_fails_not_found() {
    let result = engine().get_session("no-such-session").await;
    assert!(matches!(result, Err(EngineError::SessionNotFound(_))));
}

#[tokio::test]
async fn completed_session_rejects_further_answers_unchanged() {
    let engine = engine();
    let session = engine.start("job_loss").await.unwrap();
    let completed = engine.answer(&session.id, "2024-01-01").await.unwrap();
    assert!(completed.is_complete);

    let result = engine.answer(&session.id, "late edit").await;
    assert!(matches!(result, Err(EngineError::SessionComplete(_))));

    let reloaded = engine.get_session(&session.id).await.unwrap();
    assert_eq!(reloaded.answers, completed.answers);
    assert_eq!(reloaded.tasks, completed.tasks);
    assert_eq!(reloaded.warnings, completed.warnings);
}

#[tokio::test]
async fn job_loss_scenario_produces_expected_tasks_and_warnings() {
    let engine = engine();
    let session = engine.start("job_loss").await.unwrap();
    assert_eq!(session.current_step_id.as_deref(), Some("step1"));
    assert!(!session.is_complete);

    let completed = engine.answer(&session.id, "2024-01-01").await.unwrap();
    assert!(completed.is_complete);
    assert_eq!(completed.current_step_id, None);
    assert_eq!(
        completed.warnings,
        vec!["You have 3 months to find a new job from termination date."]
    );
    assert_eq!(completed.tasks.len(), 1);
    assert_eq!(completed.tasks[0].id, "t4");
    assert_eq!(completed.tasks[0].title, "Register with Arbetsförmedlingen");
    assert_eq!(
        completed.tasks[0].description,
        "Do this immediately on your first unemployed day."
    );
}

#[tokio::test]
async fn workflow_without_specific_rule_still_yields_a_task() {
    let engine = engine();
    let session = engine.start("onboarding").await.unwrap();
    engine.answer(&session.id, "Kim").await.unwrap();
    engine.answer(&session.id, "2025-09-01").await.unwrap();
    let completed = engine.answer(&session.id, "none").await.unwrap();

    assert!(completed.is_complete);
    assert_eq!(completed.tasks.len(), 1);
    assert_eq!(completed.tasks[0].title, "Review Requirements");
}

#[tokio::test]
async fn persistence_failure_is_reported_and_leaves_stored_state_unchanged() {
    let store = Arc::new(FlakyStore::new());
    let engine = engine_with(store.clone());
    let session = engine.start("onboarding").await.unwrap();

    store.fail_next_update();
    let result = engine.answer(&session.id, "Kim").await;
    assert!(matches!(
        result,
        Err(EngineError::Store(StoreError::Backend(_)))
    ));

    // The failed write must not have leaked into the store.
    let reloaded = engine.get_session(&session.id).await.unwrap();
    assert!(reloaded.answers.is_empty());
    assert_eq!(reloaded.current_step_id.as_deref(), Some("name"));
}

#[tokio::test]
async fn retry_after_persistence_failure_overwrites_only_that_step() {
    let store = Arc::new(FlakyStore::new());
    let engine = engine_with(store.clone());
    let session = engine.start("onboarding").await.unwrap();

    store.fail_next_update();
    assert!(engine.answer(&session.id, "first attempt").await.is_err());

    // Same step answered again; last write wins, nothing else appears.
    let retried = engine.answer(&session.id, "second attempt").await.unwrap();
    assert_eq!(retried.answers.len(), 1);
    assert_eq!(retried.answers["name"], "second attempt");
    assert_eq!(retried.current_step_id.as_deref(), Some("start_date"));
}

#[tokio::test]
async fn concurrent_answers_to_one_session_never_lose_an_update() {
    let engine = Arc::new(engine_with(Arc::new(InMemorySessionStore::new())));
    let session = engine.start("onboarding").await.unwrap();

    let mut handles = Vec::new();
    for value in ["alpha", "beta", "gamma"] {
        let engine = engine.clone();
        let session_id = session.id.clone();
        handles.push(tokio::spawn(async move {
            engine.answer(&session_id, value).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Three serialized answers against a three-step workflow: every step got
    // recorded exactly once and the session is complete.
    let final_state = engine.get_session(&session.id).await.unwrap();
    assert!(final_state.is_complete);
    assert_eq!(final_state.answers.len(), 3);
}

#[tokio::test]
async fn sessions_for_different_ids_do_not_interfere() {
    let engine = engine();
    let a = engine.start("onboarding").await.unwrap();
    let b = engine.start("job_loss").await.unwrap();

    engine.answer(&a.id, "Kim").await.unwrap();
    let b_done = engine.answer(&b.id, "2024-01-01").await.unwrap();

    let a_state = engine.get_session(&a.id).await.unwrap();
    assert!(!a_state.is_complete);
    assert_eq!(a_state.answers.len(), 1);
    assert!(b_done.is_complete);
}

#[tokio::test]
async fn history_lists_sessions_newest_first() {
    let engine = engine();
    let first = engine.start("onboarding").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = engine.start("job_loss").await.unwrap();

    let history = engine.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[1].id, first.id);
}

#[tokio::test]
async fn get_step_delegates_to_catalog() {
    let engine = engine();
    let step = engine.get_step("onboarding", "start_date").unwrap();
    assert_eq!(step.id, "start_date");

    assert!(matches!(
        engine.get_step("onboarding", "missing"),
        Err(EngineError::StepNotFound { .. })
    ));
    assert!(matches!(
        engine.get_step("missing", "start_date"),
        Err(EngineError::WorkflowNotFound(_))
    ));
}
