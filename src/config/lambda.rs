use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BenchError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use std::env;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    /// Benchmark baked into this deployment; the event's `benchmark` field
    /// overrides it.
    pub benchmark: String,
    pub s3_region: String,
    pub scratch_path: String,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            benchmark: env::var("BENCHMARK").map_err(|_| BenchError::ConfigError {
                message: "BENCHMARK environment variable is required".to_string(),
            })?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            scratch_path: env::var("SCRATCH_PATH").unwrap_or_else(|_| "/tmp/scratch".to_string()),
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn storage_path(&self) -> &str {
        ""
    }

    fn scratch_path(&self) -> &str {
        &self.scratch_path
    }

    fn worker_url(&self) -> Option<&str> {
        None
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("benchmark", &self.benchmark)?;
        validate_path("scratch_path", &self.scratch_path)?;

        if !self
            .s3_region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(BenchError::InvalidConfigValueError {
                field: "s3_region".to_string(),
                value: self.s3_region.clone(),
                reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                    .to_string(),
            });
        }

        Ok(())
    }
}
