//! Layered error definitions
//!
//! Categorized by source: config / request / aggregate / transport / cluster

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Request Errors =====
    /// Routing mode string is not one of the four known modes
    #[error("invalid routing mode '{mode}'")]
    InvalidRoutingMode { mode: String },

    /// Keyword argument missing or of the wrong shape
    #[error("invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// Command name is not in the configured catalog
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    // ===== Aggregate Errors =====
    /// Result aggregator misuse
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Misuse of [`AffectedItems`](crate::AffectedItems)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The same item was reported twice
    #[error("item '{id}' was already recorded")]
    DuplicateItem { id: String },

    /// Neither a success nor a failure was recorded
    #[error("no item was recorded, nothing to report")]
    NothingToReport,
}

/// Per-destination queue send failure
#[derive(Debug, Error)]
pub enum TransportError {
    /// Destination cannot be reached through the queue
    #[error("destination '{destination}' unreachable: {message}")]
    Unreachable {
        destination: String,
        message: String,
    },

    /// Encoded message exceeds the queue limit
    #[error("message of {size} bytes exceeds queue limit of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    /// Queue handle was already released
    #[error("queue connection closed")]
    Closed,

    /// Socket level failure
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create unreachable destination error
    pub fn unreachable(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            destination: destination.into(),
            message: message.into(),
        }
    }
}

/// Failure forwarding a request to another cluster node
#[derive(Debug, Clone, Error)]
pub enum ForwardError {
    /// Node could not be contacted
    #[error("node '{node}' unreachable: {message}")]
    Unreachable { node: String, message: String },

    /// Node answered with a call-level error
    #[error("node '{node}' returned an error: {message}")]
    Remote { node: String, message: String },
}

impl ForwardError {
    /// Create unreachable node error
    pub fn unreachable(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Node name this error refers to
    pub fn node(&self) -> &str {
        match self {
            Self::Unreachable { node, .. } | Self::Remote { node, .. } => node,
        }
    }
}
