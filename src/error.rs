//! Error types for envme

use std::path::PathBuf;
use thiserror::Error;

/// Result type for envme operations
pub type Result<T> = std::result::Result<T, EnvmeError>;

/// envme error types
#[derive(Error, Debug)]
pub enum EnvmeError {
    #[error("{0}\n\n  Run with --help for usage.")]
    Usage(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compose file parse error: {0}")]
    ComposeParse(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<serde_yaml::Error> for EnvmeError {
    fn from(err: serde_yaml::Error) -> Self {
        EnvmeError::Yaml(err.to_string())
    }
}

impl From<bollard::errors::Error> for EnvmeError {
    fn from(err: bollard::errors::Error) -> Self {
        EnvmeError::Engine(err.to_string())
    }
}

impl EnvmeError {
    /// Shorthand for a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        EnvmeError::Usage(message.into())
    }
}
