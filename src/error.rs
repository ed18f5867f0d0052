//! Error types for reply-scan.
//!
//! The scoring core itself never fails: incomplete threads degrade to
//! defaults. Errors only come from configuration, thread sources and export.

/// Top-level error type for a scan run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Thread source errors (mailbox or file).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source {name} failed to connect: {reason}")]
    ConnectFailed { name: String, reason: String },

    #[error("Authentication failed for source {name}")]
    AuthFailed { name: String },

    #[error("Protocol error from {name}: {reason}")]
    Protocol { name: String, reason: String },

    #[error("Invalid thread data: {0}")]
    InvalidData(String),

    #[error("Fetch task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report and export errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for reply-scan.
pub type Result<T> = std::result::Result<T, Error>;
