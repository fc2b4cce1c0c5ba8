use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

/// Initialize structured logging. Honors RUST_LOG; falls back to the
/// configured level otherwise.
pub fn init_telemetry(default_level: &str, json_logs: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .ok();

    tracing::info!("Vagvisare telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations. The session
/// engine stamps one onto each mutation span.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
