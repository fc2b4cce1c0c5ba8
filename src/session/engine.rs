// Session engine - orchestrates catalog lookups, step transitions, and rule
// evaluation. The only component whose behavior depends on more than one
// input.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::rules::RuleEngine;
use crate::session::store::{SessionStore, StoreError};
use crate::session::types::Session;
use crate::workflow::types::{Step, WorkflowSummary};
use crate::workflow::WorkflowCatalog;

/// Failures surfaced to callers of the engine's operation surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("step '{step_id}' not found in workflow '{workflow_id}'")]
    StepNotFound {
        workflow_id: String,
        step_id: String,
    },

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("session '{0}' is already complete and cannot be answered")]
    SessionComplete(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Guided-workflow session engine.
///
/// Shared freely (`Arc` internals); the catalog is immutable after load and
/// mutations are serialized per session id, so distinct sessions never
/// contend.
pub struct SessionEngine {
    catalog: Arc<WorkflowCatalog>,
    store: Arc<dyn SessionStore>,
    rules: RuleEngine,
    // One guard per session id: at most one in-flight mutation per session.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionEngine {
    pub fn new(catalog: Arc<WorkflowCatalog>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_rules(catalog, store, RuleEngine::with_default_rules())
    }

    pub fn with_rules(
        catalog: Arc<WorkflowCatalog>,
        store: Arc<dyn SessionStore>,
        rules: RuleEngine,
    ) -> Self {
        Self {
            catalog,
            store,
            rules,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Summaries of all loaded workflows.
    pub fn list_workflows(&self) -> Vec<WorkflowSummary> {
        self.catalog.list()
    }

    /// Start a new session positioned at the workflow's first step.
    #[instrument(
        skip(self),
        fields(correlation.id = %crate::telemetry::generate_correlation_id())
    )]
    pub async fn start(&self, workflow_id: &str) -> Result<Session, EngineError> {
        let workflow = self.catalog.get(workflow_id)?;
        let first_step = workflow
            .first_step()
            .expect("catalog rejects empty step sequences");

        let session = Session::new(workflow_id, &first_step.id);
        let stored = self.store.create(session).await?;

        info!(
            session_id = %stored.id,
            workflow_id,
            first_step = %first_step.id,
            "session started"
        );
        Ok(stored)
    }

    /// Record an answer for the session's current step and advance it.
    ///
    /// Answering the terminal step completes the session and runs the
    /// workflow's rule exactly once. Completed sessions are immutable; a
    /// persistence failure is reported as an error and leaves the stored
    /// session unchanged.
    #[instrument(
        skip(self, answer_value),
        fields(correlation.id = %crate::telemetry::generate_correlation_id())
    )]
    pub async fn answer(
        &self,
        session_id: &str,
        answer_value: &str,
    ) -> Result<Session, EngineError> {
        let guard = self.session_lock(session_id).await;
        let _held = guard.lock().await;

        let mut session = self.load(session_id).await?;
        if session.is_complete {
            // Completed sessions never mutate again; drop the lock entry so
            // the map does not grow with every rejected retry.
            self.locks.lock().await.remove(session_id);
            return Err(EngineError::SessionComplete(session_id.to_string()));
        }

        let current_step_id = session
            .current_step_id
            .clone()
            .expect("incomplete session always has a current step");
        let step = self.catalog.get_step(&session.workflow_id, &current_step_id)?;

        // Plain insert: retrying the same step overwrites only its entry.
        session
            .answers
            .insert(current_step_id.clone(), answer_value.to_string());

        match &step.next {
            Some(next) => {
                debug!(session_id, from = %current_step_id, to = %next, "advancing session");
                session.current_step_id = Some(next.clone());
            }
            None => {
                session.current_step_id = None;
                session.is_complete = true;
                let output = self.rules.evaluate(&session.workflow_id, &session.answers);
                session.tasks = output.tasks;
                session.warnings = output.warnings;
                info!(
                    session_id,
                    workflow_id = %session.workflow_id,
                    tasks = session.tasks.len(),
                    warnings = session.warnings.len(),
                    "session completed"
                );
            }
        }

        let stored = self.store.update(session).await?;
        if stored.is_complete {
            // No further mutation can arrive for this id; waiters holding a
            // clone of the Arc still drain and then hit SessionComplete.
            self.locks.lock().await.remove(session_id);
        }
        Ok(stored)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, EngineError> {
        self.load(session_id).await
    }

    pub fn get_step(&self, workflow_id: &str, step_id: &str) -> Result<&Step, EngineError> {
        self.catalog.get_step(workflow_id, step_id)
    }

    /// All sessions, newest first.
    pub async fn history(&self) -> Result<Vec<Session>, EngineError> {
        Ok(self.store.list().await?)
    }

    async fn load(&self, session_id: &str) -> Result<Session, EngineError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    // The map guard is held only long enough to fetch or insert the entry,
    // never across store I/O.
    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
