//! Dispatcher error types

use contracts::{ContractError, ForwardError};
use thiserror::Error;

/// Call-level dispatch errors
///
/// Any of these means no target was acted upon by this call, so no partial
/// result accompanies them.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Routing mode is not one of the four known modes
    #[error("invalid routing mode '{mode}'")]
    InvalidRoutingMode { mode: String },

    /// Caller may not act upon any requested target
    #[error("permission denied for operation '{operation}'")]
    PermissionDenied { operation: String },

    /// Call did not complete within the bound
    #[error("operation '{operation}' timed out after {waited_ms}ms")]
    Timeout { operation: String, waited_ms: u64 },

    /// A required remote node could not be reached
    #[error("node '{node}' unreachable: {message}")]
    RemoteUnreachable { node: String, message: String },

    /// Remote node answered with a call-level error
    #[error("node '{node}' failed: {message}")]
    Remote { node: String, message: String },

    /// No operation registered under this name
    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },

    /// Operation rejected its arguments or failed as a whole
    #[error("operation error: {0}")]
    Operation(#[from] ContractError),

    /// Scheduled task panicked or was aborted
    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: u64, message: String },
}

impl DispatchError {
    /// Create permission denied error
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied {
            operation: operation.into(),
        }
    }

    /// Create remote unreachable error
    pub fn remote_unreachable(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteUnreachable {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRoutingMode { .. } => "invalid_routing_mode",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Timeout { .. } => "timeout",
            Self::RemoteUnreachable { .. } => "remote_unreachable",
            Self::Remote { .. } => "remote",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::Operation(_) => "operation",
            Self::TaskFailed { .. } => "task_failed",
        }
    }
}

impl From<ForwardError> for DispatchError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::Unreachable { node, message } => {
                Self::RemoteUnreachable { node, message }
            }
            ForwardError::Remote { node, message } => Self::Remote { node, message },
        }
    }
}
