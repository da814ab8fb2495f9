//! Cluster membership contract
//!
//! Discovery and the node-to-node transport are provided elsewhere; the
//! dispatcher only needs roles, the member list and a forward call.

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::{AffectedItems, ForwardError, OperationRequest};

/// Role of a cluster node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    #[default]
    Master,
    Worker,
}

/// Addressable cluster node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// Unique node name
    pub name: String,
    /// Transport address, opaque to the dispatcher
    pub address: String,
    pub role: NodeRole,
}

impl NodeEndpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            role,
        }
    }
}

/// Cluster membership provider
pub trait ClusterClient: Send + Sync {
    /// The node this process runs on
    fn local_node(&self) -> &NodeEndpoint;

    /// Role of the local node
    fn current_node_role(&self) -> NodeRole {
        self.local_node().role
    }

    /// Current master, if one is known
    fn master_node(&self) -> Option<NodeEndpoint>;

    /// Reachable members other than the local node, in visiting order
    fn reachable_members(&self) -> impl Future<Output = Vec<NodeEndpoint>> + Send;

    /// Execute `request` on `node` and relay its result
    fn forward(
        &self,
        node: &NodeEndpoint,
        request: OperationRequest,
    ) -> impl Future<Output = Result<AffectedItems, ForwardError>> + Send;
}
