//! Active response error types

use contracts::{AggregateError, ContractError};
use thiserror::Error;

/// Active response specific error
///
/// Only call-level failures live here. A target that cannot be reached is a
/// failed item in the result, never an error.
#[derive(Debug, Error)]
pub enum ActiveResponseError {
    /// No target to send to
    #[error("target list cannot be empty")]
    EmptyTargetList,

    /// Command is neither in the catalog nor a script reference
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    /// Queue connection could not be opened
    #[error("active response queue unavailable: {message}")]
    QueueUnavailable { message: String },

    /// Result aggregator misuse
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<ActiveResponseError> for ContractError {
    fn from(err: ActiveResponseError) -> Self {
        match err {
            ActiveResponseError::EmptyTargetList => {
                ContractError::invalid_argument(crate::AGENT_LIST, "target list cannot be empty")
            }
            ActiveResponseError::UnknownCommand { command } => {
                ContractError::UnknownCommand { command }
            }
            ActiveResponseError::QueueUnavailable { message } => {
                ContractError::Other(format!("active response queue unavailable: {message}"))
            }
            ActiveResponseError::Aggregate(e) => ContractError::Aggregate(e),
            ActiveResponseError::Contract(e) => e,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActiveResponseError>;
