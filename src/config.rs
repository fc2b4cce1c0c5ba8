use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Vagvisare
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VagvisareConfig {
    /// Workflow definition source
    pub workflows: WorkflowsConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Session store settings (optional; in-memory when absent)
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowsConfig {
    /// Directory holding one JSON definition per workflow
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit logs as JSON instead of human-readable lines
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Sqlite file path or connection string
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for VagvisareConfig {
    fn default() -> Self {
        Self {
            workflows: WorkflowsConfig {
                dir: "workflows".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            store: None,
        }
    }
}

impl VagvisareConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration file (vagvisare.toml)
    /// 3. Environment variables (prefixed with VAGVISARE_)
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("workflows.dir", defaults.workflows.dir)?
            .set_default("observability.log_level", defaults.observability.log_level)?
            .set_default("observability.json_logs", defaults.observability.json_logs)?;

        if Path::new("vagvisare.toml").exists() {
            builder = builder.add_source(File::with_name("vagvisare"));
        }

        builder = builder.add_source(
            Environment::with_prefix("VAGVISARE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<VagvisareConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = VagvisareConfig::load_env_file();
        VagvisareConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static VagvisareConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
