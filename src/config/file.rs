use crate::utils::error::{BenchError, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML config for repeated local runs; any field a CLI flag also
/// sets loses to the flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub benchmark: Option<String>,
    pub storage_path: Option<String>,
    pub scratch_path: Option<String>,
    pub worker_url: Option<String>,
    /// Event payload as an inline TOML table.
    pub event: Option<toml::Table>,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| BenchError::ConfigError {
            message: format!("failed to parse {}: {}", path.as_ref().display(), e),
        })
    }

    /// The inline event table rendered as a JSON object string, the format
    /// the invocation path expects.
    pub fn event_json(&self) -> Result<Option<String>> {
        match &self.event {
            Some(table) => {
                let value = serde_json::to_value(table)?;
                Ok(Some(value.to_string()))
            }
            None => Ok(None),
        }
    }
}
