// Typed workflow definitions - parsed and validated once at catalog load,
// immutable for the process lifetime afterwards.

use serde::{Deserialize, Serialize};

/// One question in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub question: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Fixed choices, only meaningful for `radio` steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Id of the following step; absence marks the terminal step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

/// Input kind presented for a step. Routing never depends on this; it only
/// tells a front end what widget to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Text,
    Date,
    Radio,
    Info,
}

/// A named, ordered questionnaire. `steps[0]` is always the entry step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn first_step(&self) -> Option<&Step> {
        self.steps.first()
    }
}

/// Listing entry returned by `WorkflowCatalog::list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub title: String,
    pub description: String,
}
