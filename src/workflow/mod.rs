// Workflow definitions and the load-time catalog

pub mod catalog;
pub mod types;

pub use catalog::{ValidationError, WorkflowCatalog};
pub use types::{Step, StepType, WorkflowDefinition, WorkflowSummary};
