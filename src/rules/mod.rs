// Rule engine - pure, deterministic mapping from a completed session's
// answers to follow-up tasks and warnings.
//
// Rules are registered per workflow id so adding a workflow never touches a
// shared conditional block. Every rule must be order-stable: identical input
// yields identical output sequences, with no dependence on map iteration
// order, clocks, or randomness (answers arrive as a BTreeMap for exactly
// that reason).

pub mod permits;

use std::collections::{BTreeMap, HashMap};

use crate::session::types::Task;

/// What a rule produces for a completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutput {
    pub tasks: Vec<Task>,
    pub warnings: Vec<String>,
}

/// A workflow's business rule. Reads only from the answers map, keyed by
/// step id.
pub type Rule = Box<dyn Fn(&BTreeMap<String, String>) -> RuleOutput + Send + Sync>;

pub struct RuleEngine {
    rules: HashMap<String, Rule>,
}

impl RuleEngine {
    /// An engine with no workflow-specific rules; everything falls through
    /// to the generic fallback task.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// An engine preloaded with the built-in permit rules.
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        permits::register(&mut engine);
        engine
    }

    pub fn register<F>(&mut self, workflow_id: &str, rule: F)
    where
        F: Fn(&BTreeMap<String, String>) -> RuleOutput + Send + Sync + 'static,
    {
        self.rules.insert(workflow_id.to_string(), Box::new(rule));
    }

    /// Evaluate the rule registered for `workflow_id` against the collected
    /// answers. Guarantees at least one task: an unregistered workflow, or a
    /// rule that produced none, gets the generic review task appended.
    pub fn evaluate(&self, workflow_id: &str, answers: &BTreeMap<String, String>) -> RuleOutput {
        let mut output = match self.rules.get(workflow_id) {
            Some(rule) => rule(answers),
            None => RuleOutput::default(),
        };

        if output.tasks.is_empty() {
            output.tasks.push(generic_task());
        }
        output
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Fallback task appended whenever a workflow's rule yields nothing.
fn generic_task() -> Task {
    Task::new(
        "t_gen",
        "Review Requirements",
        "Check Migration Agency website.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unregistered_workflow_gets_generic_task() {
        let engine = RuleEngine::new();
        let output = engine.evaluate("unknown", &answers(&[("a", "b")]));
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].id, "t_gen");
        assert_eq!(output.tasks[0].title, "Review Requirements");
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn empty_rule_output_falls_back_to_generic_task() {
        let mut engine = RuleEngine::new();
        engine.register("quiet", |_| RuleOutput::default());

        let output = engine.evaluate("quiet", &answers(&[]));
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].id, "t_gen");
    }

    #[test]
    fn rule_with_tasks_is_not_padded() {
        let mut engine = RuleEngine::new();
        engine.register("busy", |_| RuleOutput {
            tasks: vec![Task::new("t1", "Do a thing", "Now.")],
            warnings: vec![],
        });

        let output = engine.evaluate("busy", &answers(&[]));
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].id, "t1");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let engine = RuleEngine::with_default_rules();
        let input = answers(&[
            ("expiry_date", "2025-06-01"),
            ("employment_status", "Yes, same employer"),
            ("supporting_docs", "passport copy"),
        ]);

        let first = engine.evaluate("renewal", &input);
        for _ in 0..5 {
            let again = engine.evaluate("renewal", &input);
            assert_eq!(again.tasks, first.tasks);
            assert_eq!(again.warnings, first.warnings);
        }
    }
}
