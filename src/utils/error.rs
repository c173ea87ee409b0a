use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Storage error in bucket '{bucket}': {message}")]
    StorageError { bucket: String, message: String },

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("NoSQL operation '{operation}' failed on table '{table}': {message}")]
    NoSqlError {
        operation: String,
        table: String,
        message: String,
    },

    #[error("Unknown benchmark: {0}")]
    UnknownBenchmark(String),

    #[error("Malformed event: {message}")]
    EventError { message: String },

    #[error("Network benchmark timed out after {attempts} attempts")]
    NetworkTimeout { attempts: usize },
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    Network,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BenchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BenchError::ConfigError { .. } | BenchError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            BenchError::EventError { .. } | BenchError::UnknownBenchmark(_) => ErrorCategory::Input,
            BenchError::StorageError { .. }
            | BenchError::ObjectNotFound { .. }
            | BenchError::NoSqlError { .. } => ErrorCategory::Storage,
            BenchError::HttpError(_) | BenchError::NetworkTimeout { .. } => ErrorCategory::Network,
            BenchError::ZipError(_)
            | BenchError::CsvError(_)
            | BenchError::IoError(_)
            | BenchError::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Internal => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check environment variables and CLI flags against the documentation"
            }
            ErrorCategory::Input => {
                "Verify the event payload: benchmark name, bucket/object descriptors, counts"
            }
            ErrorCategory::Storage => {
                "Verify bucket names, object keys, and that the storage backend is reachable"
            }
            ErrorCategory::Network => "Check connectivity to the target endpoint and retry",
            ErrorCategory::Internal => "Inspect the logs; this is likely a bug or a bad payload",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BenchError::UnknownBenchmark(name) => {
                format!("No benchmark named '{}' is registered", name)
            }
            BenchError::ObjectNotFound { bucket, key } => {
                format!("The object {}/{} does not exist", bucket, key)
            }
            other => other.to_string(),
        }
    }
}
