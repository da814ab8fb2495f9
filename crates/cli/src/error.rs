//! Error types for CLI operations.

use contracts::AggregateError;
use dispatcher::DispatchError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Agent queue socket is not available on this platform
    #[cfg(not(unix))]
    #[error("Agent queue is not supported on this platform, use --simulate")]
    QueueUnsupported,

    /// Dispatcher refused or failed the request as a whole
    #[error("Request failed ({kind}): {source}")]
    Dispatch {
        kind: &'static str,
        #[source]
        source: DispatchError,
    },

    /// Result could not be turned into a response
    #[error("Failed to build response: {0}")]
    Aggregate(#[from] AggregateError),

    /// Response could not be rendered
    #[error("Failed to render response: {0}")]
    Render(#[from] serde_json::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

impl From<DispatchError> for CliError {
    fn from(source: DispatchError) -> Self {
        Self::Dispatch {
            kind: source.kind(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
