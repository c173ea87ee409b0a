use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use std::env;

/// Container entrypoint configuration, environment-derived like the
/// platform injects it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub storage_path: String,
    pub scratch_path: String,
    /// Default fronting Worker for storage/NoSQL; the `X-Worker-URL` request
    /// header overrides it per invocation.
    pub worker_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        Ok(Self {
            port,
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "/tmp/storage".to_string()),
            scratch_path: env::var("SCRATCH_PATH").unwrap_or_else(|_| "/tmp/scratch".to_string()),
            worker_url: env::var("WORKER_URL").ok(),
        })
    }
}

impl ConfigProvider for ServerConfig {
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

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_path("storage_path", &self.storage_path)?;
        validate_path("scratch_path", &self.scratch_path)?;
        validate_range("port", self.port as usize, 1, 65535)?;
        if let Some(url) = &self.worker_url {
            validate_url("worker_url", url)?;
        }
        Ok(())
    }
}
