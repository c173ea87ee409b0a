use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_url, Validate};
use clap::Parser;

/// One-shot local invocation of a benchmark against filesystem storage and
/// the in-memory NoSQL table (or a Worker proxy when `--worker-url` is set).
#[derive(Debug, Clone, Parser)]
#[command(name = "faasbench")]
#[command(about = "Run a serverless benchmark function locally")]
pub struct CliConfig {
    /// Benchmark to invoke (uploader, compression, network, crud-api)
    #[arg(long)]
    pub benchmark: Option<String>,

    /// Event payload as inline JSON
    #[arg(long, default_value = "{}")]
    pub event: String,

    /// Read the event payload from a JSON file instead
    #[arg(long)]
    pub event_file: Option<String>,

    /// Optional TOML config file; CLI flags win over its values
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, default_value = "./storage")]
    pub storage_path: String,

    #[arg(long, default_value = "./scratch")]
    pub scratch_path: String,

    /// Route storage/NoSQL through a fronting Worker instead of local backends
    #[arg(long)]
    pub worker_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Sample process memory into the measurement block")]
    pub monitor: bool,
}

impl ConfigProvider for CliConfig {
    fn storage_path(&self) -> &str {
        &self.storage_path
    }

    fn scratch_path(&self) -> &str {
        &self.scratch_path
    }

    fn worker_url(&self) -> Option<&str> {
        self.worker_url.as_deref()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.benchmark.is_none() {
            return Err(crate::utils::error::BenchError::ConfigError {
                message: "a benchmark must be given via --benchmark or the config file"
                    .to_string(),
            });
        }
        validate_path("storage_path", &self.storage_path)?;
        validate_path("scratch_path", &self.scratch_path)?;
        if let Some(url) = &self.worker_url {
            validate_url("worker_url", url)?;
        }
        Ok(())
    }
}
