//! Cluster clients
//!
//! `StandaloneCluster` is a single node acting as its own master.
//! `InProcessCluster` simulates peers with their own operation registries,
//! with injectable outages and latency, for tests and local runs.

use std::collections::HashSet;
use std::time::Duration;

use contracts::{
    AffectedItems, ClusterClient, ForwardError, NodeEndpoint, NodeRole, OperationRequest,
    ServiceConfig,
};
use tracing::{debug, instrument, warn};

use crate::permissions::filter_request;
use crate::registry::OperationRegistry;

/// Single node, always master, no peers
#[derive(Debug, Clone)]
pub struct StandaloneCluster {
    node: NodeEndpoint,
}

impl StandaloneCluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: NodeEndpoint::new(name, "localhost", NodeRole::Master),
        }
    }
}

impl ClusterClient for StandaloneCluster {
    fn local_node(&self) -> &NodeEndpoint {
        &self.node
    }

    fn master_node(&self) -> Option<NodeEndpoint> {
        Some(self.node.clone())
    }

    async fn reachable_members(&self) -> Vec<NodeEndpoint> {
        Vec::new()
    }

    async fn forward(
        &self,
        node: &NodeEndpoint,
        _request: OperationRequest,
    ) -> Result<AffectedItems, ForwardError> {
        Err(ForwardError::unreachable(
            &node.name,
            "standalone node has no peers",
        ))
    }
}

struct Peer {
    endpoint: NodeEndpoint,
    registry: OperationRegistry,
}

/// Cluster whose peers run inside this process
pub struct InProcessCluster {
    local: NodeEndpoint,
    /// Peers in visiting order
    peers: Vec<Peer>,
    down: HashSet<String>,
    latency: Option<Duration>,
}

impl InProcessCluster {
    pub fn new(local: NodeEndpoint) -> Self {
        Self {
            local,
            peers: Vec::new(),
            down: HashSet::new(),
            latency: None,
        }
    }

    /// Build from the cluster section of a service config
    ///
    /// Every peer gets a clone of `registry`.
    pub fn from_config(config: &ServiceConfig, registry: &OperationRegistry) -> Self {
        let local = config
            .cluster
            .members
            .iter()
            .find(|m| m.name == config.node.name)
            .map(|m| NodeEndpoint::new(&m.name, &m.address, m.role))
            .unwrap_or_else(|| NodeEndpoint::new(&config.node.name, "localhost", config.node.role));

        let local_name = local.name.clone();
        config
            .cluster
            .members
            .iter()
            .filter(|m| m.name != local_name)
            .fold(Self::new(local), |cluster, m| {
                cluster.with_peer(
                    NodeEndpoint::new(&m.name, &m.address, m.role),
                    registry.clone(),
                )
            })
    }

    /// Add a peer executing operations from `registry`
    pub fn with_peer(mut self, endpoint: NodeEndpoint, registry: OperationRegistry) -> Self {
        self.peers.push(Peer { endpoint, registry });
        self
    }

    /// Make `name` fail every forward with `Unreachable`
    pub fn with_down_peer(mut self, name: impl Into<String>) -> Self {
        self.down.insert(name.into());
        self
    }

    /// Delay every forward by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl ClusterClient for InProcessCluster {
    fn local_node(&self) -> &NodeEndpoint {
        &self.local
    }

    fn master_node(&self) -> Option<NodeEndpoint> {
        if self.local.role == NodeRole::Master {
            return Some(self.local.clone());
        }
        self.peers
            .iter()
            .find(|p| p.endpoint.role == NodeRole::Master)
            .map(|p| p.endpoint.clone())
    }

    async fn reachable_members(&self) -> Vec<NodeEndpoint> {
        self.peers.iter().map(|p| p.endpoint.clone()).collect()
    }

    #[instrument(
        name = "in_process_forward",
        skip(self, node, request),
        fields(node = %node.name, operation = %request.operation)
    )]
    async fn forward(
        &self,
        node: &NodeEndpoint,
        request: OperationRequest,
    ) -> Result<AffectedItems, ForwardError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let peer = self
            .peers
            .iter()
            .find(|p| p.endpoint.name == node.name)
            .filter(|p| !self.down.contains(&p.endpoint.name))
            .ok_or_else(|| {
                warn!(node = %node.name, "Peer unreachable");
                ForwardError::unreachable(&node.name, "connection refused")
            })?;

        let remote = |e: crate::DispatchError| ForwardError::Remote {
            node: node.name.clone(),
            message: e.to_string(),
        };

        let filtered = filter_request(&request).map_err(remote)?;
        let result = peer
            .registry
            .invoke(&filtered.operation, filtered.kwargs)
            .await
            .map_err(remote)?;

        debug!(
            node = %node.name,
            affected = result.total_affected_items(),
            "Peer executed request"
        );
        Ok(result)
    }
}
