// Workflow catalog - loads definitions from a directory at startup, rejects
// structurally broken ones, and serves read-only lookups afterwards.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use super::types::{Step, StepType, WorkflowDefinition, WorkflowSummary};
use crate::session::engine::EngineError;

/// Structural problems that get a definition rejected at load time.
///
/// These are recovered locally: the offending definition is dropped and
/// logged, the rest of the catalog still loads.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("workflow '{workflow}' has an empty step sequence")]
    EmptySteps { workflow: String },

    #[error("workflow '{workflow}' defines step '{step}' more than once")]
    DuplicateStepId { workflow: String, step: String },

    #[error("workflow '{workflow}': step '{step}' points to unknown step '{next}'")]
    DanglingNext {
        workflow: String,
        step: String,
        next: String,
    },

    #[error("workflow '{workflow}': step chain starting at '{step}' never terminates")]
    StepCycle { workflow: String, step: String },

    #[error("workflow '{workflow}': radio step '{step}' has no options")]
    MissingOptions { workflow: String, step: String },

    #[error("definition failed to parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("definition could not be read: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only registry of validated workflow definitions.
///
/// Built once at startup, then shared behind an `Arc` and read without
/// synchronization.
#[derive(Debug, Default)]
pub struct WorkflowCatalog {
    workflows: HashMap<String, WorkflowDefinition>,
    order: Vec<String>,
    rejected: Vec<(String, ValidationError)>,
}

impl WorkflowCatalog {
    /// Load every `*.json` definition under `dir`. Files are visited in
    /// sorted-filename order so the listing is stable across runs. A file
    /// that fails to parse or validate is skipped, not fatal.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, std::io::Error> {
        let mut catalog = Self::default();

        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let label = path.display().to_string();
            match Self::parse_file(&path) {
                Ok(definition) => catalog.insert(definition),
                Err(err) => {
                    warn!(definition = %label, error = %err, "skipping workflow definition");
                    catalog.rejected.push((label, err));
                }
            }
        }

        info!(
            loaded = catalog.workflows.len(),
            rejected = catalog.rejected.len(),
            "workflow catalog ready"
        );
        Ok(catalog)
    }

    /// Build a catalog from in-memory definitions, applying the same
    /// validation as `load_dir`.
    pub fn from_definitions(definitions: Vec<WorkflowDefinition>) -> Self {
        let mut catalog = Self::default();
        for definition in definitions {
            let id = definition.id.clone();
            match validate(&definition) {
                Ok(()) => catalog.insert(definition),
                Err(err) => {
                    warn!(workflow = %id, error = %err, "skipping workflow definition");
                    catalog.rejected.push((id, err));
                }
            }
        }
        catalog
    }

    fn parse_file(path: &Path) -> Result<WorkflowDefinition, ValidationError> {
        let raw = std::fs::read_to_string(path)?;
        let definition: WorkflowDefinition = serde_json::from_str(&raw)?;
        validate(&definition)?;
        Ok(definition)
    }

    fn insert(&mut self, definition: WorkflowDefinition) {
        if self.workflows.contains_key(&definition.id) {
            warn!(workflow = %definition.id, "duplicate workflow id, keeping first definition");
            return;
        }
        self.order.push(definition.id.clone());
        self.workflows.insert(definition.id.clone(), definition);
    }

    /// Summaries of all loaded workflows, in load order.
    pub fn list(&self) -> Vec<WorkflowSummary> {
        self.order
            .iter()
            .filter_map(|id| self.workflows.get(id))
            .map(|wf| WorkflowSummary {
                id: wf.id.clone(),
                title: wf.title.clone(),
                description: wf.description.clone(),
            })
            .collect()
    }

    pub fn get(&self, workflow_id: &str) -> Result<&WorkflowDefinition, EngineError> {
        self.workflows
            .get(workflow_id)
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }

    pub fn get_step(&self, workflow_id: &str, step_id: &str) -> Result<&Step, EngineError> {
        self.get(workflow_id)?
            .step(step_id)
            .ok_or_else(|| EngineError::StepNotFound {
                workflow_id: workflow_id.to_string(),
                step_id: step_id.to_string(),
            })
    }

    /// Definitions rejected during load, for diagnostics.
    pub fn rejected(&self) -> &[(String, ValidationError)] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// Structural validation, run once per definition before it becomes visible.
/// Traversal-time code relies on this and never re-checks the graph.
fn validate(definition: &WorkflowDefinition) -> Result<(), ValidationError> {
    let workflow = &definition.id;

    if definition.steps.is_empty() {
        return Err(ValidationError::EmptySteps {
            workflow: workflow.clone(),
        });
    }

    let mut ids = HashSet::new();
    for step in &definition.steps {
        if !ids.insert(step.id.as_str()) {
            return Err(ValidationError::DuplicateStepId {
                workflow: workflow.clone(),
                step: step.id.clone(),
            });
        }
        if step.step_type == StepType::Radio
            && step.options.as_ref().is_none_or(|opts| opts.is_empty())
        {
            return Err(ValidationError::MissingOptions {
                workflow: workflow.clone(),
                step: step.id.clone(),
            });
        }
    }

    for step in &definition.steps {
        if let Some(next) = &step.next {
            if !ids.contains(next.as_str()) {
                return Err(ValidationError::DanglingNext {
                    workflow: workflow.clone(),
                    step: step.id.clone(),
                    next: next.clone(),
                });
            }
        }
    }

    // Every step has at most one out-edge, so a chain longer than the step
    // count must have revisited a step.
    for start in &definition.steps {
        let mut current = start;
        for _ in 0..definition.steps.len() {
            match &current.next {
                None => break,
                Some(next) => {
                    current = definition
                        .step(next)
                        .expect("next references validated above");
                }
            }
        }
        if current.next.is_some() {
            return Err(ValidationError::StepCycle {
                workflow: workflow.clone(),
                step: start.id.clone(),
            });
        }
    }

    Ok(())
}
