//! End-to-end runs of the shipped permit workflows, loaded from the JSON
//! fixtures and evaluated with the default rule set.

use std::sync::Arc;

use vagvisare::session::{InMemorySessionStore, SessionEngine};
use vagvisare::workflow::WorkflowCatalog;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/workflows");

fn engine() -> SessionEngine {
    let catalog = WorkflowCatalog::load_dir(FIXTURES).unwrap();
    SessionEngine::new(Arc::new(catalog), Arc::new(InMemorySessionStore::new()))
}

#[tokio::test]
async fn renewal_run_produces_dated_submission_task() {
    let engine = engine();
    let session = engine.start("renewal").await.unwrap();

    engine.answer(&session.id, "2025-11-30").await.unwrap();
    engine
        .answer(&session.id, "Yes, same employer")
        .await
        .unwrap();
    let completed = engine.answer(&session.id, "passport copy").await.unwrap();

    assert!(completed.is_complete);
    assert_eq!(completed.tasks.len(), 1);
    assert_eq!(completed.tasks[0].id, "t1");
    assert_eq!(completed.tasks[0].title, "Submit Application");
    assert_eq!(completed.tasks[0].description, "Submit before 2025-11-30");
    assert_eq!(completed.tasks[0].due_date.as_deref(), Some("2025-11-30"));
    assert_eq!(
        completed.warnings,
        vec!["Ensure your passport is valid during the processing time."]
    );
}

#[tokio::test]
async fn recent_permit_holder_changing_employer_gets_new_application_task() {
    let engine = engine();
    let session = engine.start("change_employer").await.unwrap();

    engine
        .answer(&session.id, "Less than 24 months")
        .await
        .unwrap();
    let completed = engine
        .answer(&session.id, "Senior engineer at a new firm")
        .await
        .unwrap();

    assert!(completed.is_complete);
    assert_eq!(completed.tasks[0].id, "t2");
    assert_eq!(completed.tasks[0].title, "Apply for New Permit");
    assert_eq!(
        completed.warnings,
        vec!["Changing employer within the first 24 months requires a new application."]
    );
}

#[tokio::test]
async fn long_permit_holder_changing_employer_gets_sector_check() {
    let engine = engine();
    let session = engine.start("change_employer").await.unwrap();

    engine.answer(&session.id, "24 months or more").await.unwrap();
    let completed = engine.answer(&session.id, "Same occupation").await.unwrap();

    assert!(completed.is_complete);
    assert_eq!(completed.tasks[0].id, "t3");
    assert_eq!(completed.tasks[0].title, "Check Sector");
    assert!(completed.warnings.is_empty());
}

#[tokio::test]
async fn listing_matches_loaded_fixture_workflows() {
    let engine = engine();
    let summaries = engine.list_workflows();

    let ids: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["change_employer", "job_loss", "renewal"]);
    assert!(summaries
        .iter()
        .all(|summary| !summary.title.is_empty() && !summary.description.is_empty()));
}
