// Vagvisare - guided-workflow session engine
// This exposes the core components for testing and integration

pub mod config;
pub mod rules;
pub mod session;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, VagvisareConfig};
pub use rules::{RuleEngine, RuleOutput};
pub use session::{
    EngineError, InMemorySessionStore, Session, SessionEngine, SessionStore, StoreError, Task,
};
#[cfg(feature = "database")]
pub use session::SqliteSessionStore;
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use workflow::{
    Step, StepType, ValidationError, WorkflowCatalog, WorkflowDefinition, WorkflowSummary,
};
