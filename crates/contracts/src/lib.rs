//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the
//! operation request, the per-item result aggregator, the collaborator traits
//! (permission resolver, queue transport, cluster client) and the service
//! configuration. Business crates depend on this crate only; reverse
//! dependencies are prohibited.

mod affected_items;
mod cluster;
mod command;
mod error;
mod operation;
mod permission;
mod service_config;
mod transport;

pub use affected_items::*;
pub use cluster::*;
pub use command::{CommandMessage, SCRIPT_MARKER};
pub use error::*;
pub use operation::*;
pub use permission::*;
pub use service_config::*;
pub use transport::{LocalQueueTransport, QueueTransport};
