// Session and task records - the only mutable state in the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An actionable follow-up item produced once a session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Task {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            due_date: None,
        }
    }

    pub fn with_due_date(mut self, due_date: &str) -> Self {
        self.due_date = Some(due_date.to_string());
        self
    }
}

/// One user's run through a workflow.
///
/// `current_step_id` is `None` exactly when `is_complete` is true. Answers
/// live in a `BTreeMap` so iteration order is stable for rule evaluation and
/// serialization. `version` is managed by the session store and backs its
/// optimistic write check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub workflow_id: String,
    pub current_step_id: Option<String>,
    pub answers: BTreeMap<String, String>,
    pub is_complete: bool,
    pub tasks: Vec<Task>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Session {
    /// Fresh session positioned at a workflow's entry step.
    pub fn new(workflow_id: &str, first_step_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            current_step_id: Some(first_step_id.to_string()),
            answers: BTreeMap::new(),
            is_complete: false,
            tasks: Vec::new(),
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}
