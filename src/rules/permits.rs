// Built-in rules for the Swedish work-permit workflows.

use std::collections::BTreeMap;

use crate::session::types::Task;

use super::{RuleEngine, RuleOutput};

pub fn register(engine: &mut RuleEngine) {
    engine.register("renewal", renewal);
    engine.register("change_employer", change_employer);
    engine.register("job_loss", job_loss);
}

fn renewal(answers: &BTreeMap<String, String>) -> RuleOutput {
    let mut output = RuleOutput::default();
    if let Some(expiry) = answers.get("expiry_date") {
        output.tasks.push(
            Task::new(
                "t1",
                "Submit Application",
                &format!("Submit before {expiry}"),
            )
            .with_due_date(expiry),
        );
        output
            .warnings
            .push("Ensure your passport is valid during the processing time.".to_string());
    }
    output
}

fn change_employer(answers: &BTreeMap<String, String>) -> RuleOutput {
    let mut output = RuleOutput::default();
    if answers.get("permit_duration").map(String::as_str) == Some("Less than 24 months") {
        output.warnings.push(
            "Changing employer within the first 24 months requires a new application.".to_string(),
        );
        output.tasks.push(Task::new(
            "t2",
            "Apply for New Permit",
            "Submit application before starting new job.",
        ));
    } else {
        output.tasks.push(Task::new(
            "t3",
            "Check Sector",
            "If strictly changing occupation, new permit needed. If same occupation, no new permit needed.",
        ));
    }
    output
}

fn job_loss(_answers: &BTreeMap<String, String>) -> RuleOutput {
    RuleOutput {
        tasks: vec![Task::new(
            "t4",
            "Register with Arbetsförmedlingen",
            "Do this immediately on your first unemployed day.",
        )],
        warnings: vec!["You have 3 months to find a new job from termination date.".to_string()],
    }
}
