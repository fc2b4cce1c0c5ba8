use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;

use vagvisare::config::VagvisareConfig;
use vagvisare::session::{InMemorySessionStore, Session, SessionEngine, SessionStore};
use vagvisare::workflow::{Step, WorkflowCatalog};

#[derive(Parser)]
#[command(name = "vagvisare")]
#[command(about = "Guided workflows for work-permit questions")]
#[command(
    long_about = "Vagvisare walks you through guided questionnaires (permit renewal, \
                  changing employer, job loss) and derives the follow-up tasks and \
                  warnings that apply to your situation. Start with 'vagvisare list'."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available workflows
    List,
    /// Run a workflow interactively, answering each step on stdin
    Run {
        /// Workflow id to start (see 'vagvisare list')
        workflow_id: String,
    },
    /// Show a single step of a workflow
    Step {
        workflow_id: String,
        step_id: String,
    },
    /// Show a stored session
    Show { session_id: String },
    /// List all stored sessions, newest first
    History,
    /// Write a default vagvisare.toml to the current directory
    Init {
        /// Overwrite an existing vagvisare.toml
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = vagvisare::config::config()?;
    vagvisare::telemetry::init_telemetry(
        &config.observability.log_level,
        config.observability.json_logs,
    )?;
    vagvisare::config::init_config()?;

    match cli.command {
        Commands::List => {
            tokio::runtime::Runtime::new()?.block_on(async { list_command().await })
        }
        Commands::Run { workflow_id } => {
            tokio::runtime::Runtime::new()?.block_on(async { run_command(&workflow_id).await })
        }
        Commands::Step {
            workflow_id,
            step_id,
        } => tokio::runtime::Runtime::new()?
            .block_on(async { step_command(&workflow_id, &step_id).await }),
        Commands::Show { session_id } => {
            tokio::runtime::Runtime::new()?.block_on(async { show_command(&session_id).await })
        }
        Commands::History => {
            tokio::runtime::Runtime::new()?.block_on(async { history_command().await })
        }
        Commands::Init { force } => init_command(force),
    }
}

async fn build_engine() -> Result<SessionEngine> {
    let config = vagvisare::config::config()?;

    let catalog = WorkflowCatalog::load_dir(&config.workflows.dir).with_context(|| {
        format!(
            "failed to read workflow directory '{}'",
            config.workflows.dir
        )
    })?;

    let store = build_store(config).await?;
    Ok(SessionEngine::new(Arc::new(catalog), store))
}

#[cfg(feature = "database")]
async fn build_store(config: &VagvisareConfig) -> Result<Arc<dyn SessionStore>> {
    if let Some(store_config) = &config.store {
        let store = vagvisare::session::SqliteSessionStore::connect(
            &store_config.url,
            store_config.max_connections,
            store_config.auto_migrate,
        )
        .await?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(InMemorySessionStore::new()))
}

#[cfg(not(feature = "database"))]
async fn build_store(config: &VagvisareConfig) -> Result<Arc<dyn SessionStore>> {
    if config.store.is_some() {
        tracing::warn!("store configured but the 'database' feature is disabled, using memory");
    }
    Ok(Arc::new(InMemorySessionStore::new()))
}

async fn list_command() -> Result<()> {
    let engine = build_engine().await?;
    let workflows = engine.list_workflows();

    if workflows.is_empty() {
        println!("No workflows loaded. Check the 'workflows.dir' setting.");
        return Ok(());
    }

    println!("📋 Available workflows:");
    println!();
    for summary in workflows {
        println!("  {} - {}", summary.id, summary.title);
        if !summary.description.is_empty() {
            println!("      {}", summary.description);
        }
    }
    Ok(())
}

async fn run_command(workflow_id: &str) -> Result<()> {
    let engine = build_engine().await?;
    let mut session = engine.start(workflow_id).await?;
    println!("▶️  Started session {} ({})", session.id, workflow_id);

    let stdin = std::io::stdin();
    while let Some(step_id) = session.current_step_id.clone() {
        let step = engine.get_step(&session.workflow_id, &step_id)?;
        print_step(step);

        print!("> ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        stdin.read_line(&mut answer)?;

        session = engine.answer(&session.id, answer.trim()).await?;
    }

    println!();
    println!("✅ Session complete");
    print_outcome(&session);
    Ok(())
}

async fn step_command(workflow_id: &str, step_id: &str) -> Result<()> {
    let engine = build_engine().await?;
    let step = engine.get_step(workflow_id, step_id)?;
    print_step(step);
    Ok(())
}

async fn show_command(session_id: &str) -> Result<()> {
    let engine = build_engine().await?;
    let session = engine.get_session(session_id).await?;
    print_session(&session);
    Ok(())
}

async fn history_command() -> Result<()> {
    let engine = build_engine().await?;
    let sessions = engine.history().await?;

    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    for session in sessions {
        print_session(&session);
        println!();
    }
    Ok(())
}

fn init_command(force: bool) -> Result<()> {
    let path = "vagvisare.toml";
    if std::path::Path::new(path).exists() && !force {
        anyhow::bail!("{path} already exists, pass --force to overwrite");
    }
    VagvisareConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {path}");
    Ok(())
}

fn print_step(step: &Step) {
    println!();
    println!("── {} ──", step.title);
    println!("{}", step.question);
    if let Some(options) = &step.options {
        for option in options {
            println!("  • {option}");
        }
    }
}

fn print_session(session: &Session) {
    let status = if session.is_complete {
        "complete".to_string()
    } else {
        format!(
            "at step {}",
            session.current_step_id.as_deref().unwrap_or("?")
        )
    };
    println!(
        "{} [{}] {} ({})",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.workflow_id,
        session.id,
        status
    );
    for (step_id, answer) in &session.answers {
        println!("    {step_id}: {answer}");
    }
    if session.is_complete {
        print_outcome(session);
    }
}

fn print_outcome(session: &Session) {
    for warning in &session.warnings {
        println!("⚠️  {warning}");
    }
    for task in &session.tasks {
        match &task.due_date {
            Some(due) => println!("📌 {} (due {due}): {}", task.title, task.description),
            None => println!("📌 {}: {}", task.title, task.description),
        }
    }
}
