//! Dispatcher - routes operation requests across the cluster

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use contracts::{
    AffectedItems, ClusterClient, DispatchConfig, ErrorKind, ForwardError, NodeRole, Operation,
    OperationRequest, RoutingMode,
};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::handle::AsyncHandle;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::permissions::{ensure_permitted, filter_request};
use crate::registry::OperationRegistry;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Bound on a call that does not wait for completion
    pub request_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&DispatchConfig> for DispatcherConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<C> {
    cluster: C,
    config: DispatcherConfig,
    registry: OperationRegistry,
}

impl<C: ClusterClient + 'static> DispatcherBuilder<C> {
    pub fn new(cluster: C) -> Self {
        Self {
            cluster,
            config: DispatcherConfig::default(),
            registry: OperationRegistry::new(),
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an operation executable on this node
    pub fn operation<O: Operation + 'static>(mut self, operation: O) -> Self {
        self.registry.register(operation);
        self
    }

    /// Replace the whole registry
    pub fn registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Dispatcher<C> {
        info!(
            node = %self.cluster.local_node().name,
            operations = ?self.registry.names(),
            timeout_ms = self.config.request_timeout.as_millis() as u64,
            "Dispatcher ready"
        );
        Dispatcher {
            inner: Arc::new(Inner {
                cluster: self.cluster,
                registry: self.registry,
                config: self.config,
                metrics: DispatchMetrics::new(),
                next_task_id: AtomicU64::new(1),
            }),
        }
    }
}

/// Result of [`Dispatcher::distribute`]
#[derive(Debug)]
pub enum DistributeOutcome {
    /// Call ran to completion
    Completed(AffectedItems),
    /// Call was scheduled; the handle is the acknowledgment
    Accepted(AsyncHandle),
}

impl DistributeOutcome {
    /// Completed result, if the call was not scheduled
    pub fn completed(self) -> Option<AffectedItems> {
        match self {
            Self::Completed(items) => Some(items),
            Self::Accepted(_) => None,
        }
    }
}

struct Inner<C> {
    cluster: C,
    registry: OperationRegistry,
    config: DispatcherConfig,
    metrics: DispatchMetrics,
    next_task_id: AtomicU64,
}

/// Entry point for every operation request
///
/// Cheap to clone; clones share the registry, cluster client and metrics.
pub struct Dispatcher<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: ClusterClient + 'static> Dispatcher<C> {
    pub fn builder(cluster: C) -> DispatcherBuilder<C> {
        DispatcherBuilder::new(cluster)
    }

    pub fn cluster(&self) -> &C {
        &self.inner.cluster
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Route `request` and return its result or an acknowledgment
    ///
    /// Routing mode and permission set are checked before anything runs,
    /// also for asynchronous requests.
    ///
    /// # Errors
    /// - `InvalidRoutingMode` for an unknown `request_type`
    /// - `PermissionDenied` when the caller may act upon no target
    /// - `Timeout` when the bound expires; partial results are discarded
    /// - `RemoteUnreachable` when the master cannot be reached
    #[instrument(
        name = "dispatcher_distribute",
        skip(self, request),
        fields(
            operation = %request.operation,
            mode = %request.request_type,
            is_async = request.is_async
        )
    )]
    pub async fn distribute(
        &self,
        request: &OperationRequest,
    ) -> Result<DistributeOutcome, DispatchError> {
        self.inner.metrics.inc_calls();

        let checked = request
            .routing_mode()
            .map_err(|_| DispatchError::InvalidRoutingMode {
                mode: request.request_type.clone(),
            })
            .and_then(|mode| ensure_permitted(request).map(|()| mode));
        let mode = match checked {
            Ok(mode) => mode,
            Err(e) => {
                self.inner.metrics.inc_failed();
                warn!(error = %e, "Request rejected");
                return Err(e);
            }
        };

        if request.is_async {
            return Ok(DistributeOutcome::Accepted(self.schedule(request, mode)));
        }

        self.run_bounded(request, mode)
            .await
            .map(DistributeOutcome::Completed)
    }

    fn schedule(&self, request: &OperationRequest, mode: RoutingMode) -> AsyncHandle {
        let task_id = self.inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        self.inner.metrics.inc_accepted();
        debug!(task_id, operation = %request.operation, "Request scheduled");

        let this = self.clone();
        let owned = request.clone();
        let task = tokio::spawn(async move { this.run_bounded(&owned, mode).await });
        AsyncHandle::new(task_id, &request.operation, task)
    }

    async fn run_bounded(
        &self,
        request: &OperationRequest,
        mode: RoutingMode,
    ) -> Result<AffectedItems, DispatchError> {
        let started = Instant::now();
        let metrics = &self.inner.metrics;

        let result = if request.wait_for_complete {
            self.route(request, mode).await
        } else {
            let limit = self.inner.config.request_timeout;
            match tokio::time::timeout(limit, self.route(request, mode)).await {
                Ok(result) => result,
                Err(_) => {
                    metrics.inc_timeouts();
                    warn!(
                        operation = %request.operation,
                        waited_ms = limit.as_millis() as u64,
                        "Request timed out"
                    );
                    return Err(DispatchError::Timeout {
                        operation: request.operation.clone(),
                        waited_ms: limit.as_millis() as u64,
                    });
                }
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(items) => {
                metrics.inc_completed();
                info!(
                    operation = %request.operation,
                    mode = %mode,
                    affected = items.total_affected_items(),
                    failed = items.total_failed_items(),
                    elapsed_ms,
                    "Request completed"
                );
            }
            Err(e) => {
                metrics.inc_failed();
                warn!(
                    operation = %request.operation,
                    mode = %mode,
                    error = %e,
                    kind = e.kind(),
                    elapsed_ms,
                    "Request failed"
                );
            }
        }
        result
    }

    async fn route(
        &self,
        request: &OperationRequest,
        mode: RoutingMode,
    ) -> Result<AffectedItems, DispatchError> {
        match mode {
            RoutingMode::Local | RoutingMode::LocalAny => self.execute_local(request).await,
            RoutingMode::DistributedMaster => self.route_to_master(request).await,
            RoutingMode::DistributedBroadcast => self.broadcast(request).await,
        }
    }

    async fn execute_local(
        &self,
        request: &OperationRequest,
    ) -> Result<AffectedItems, DispatchError> {
        let filtered = filter_request(request)?;
        self.inner
            .registry
            .invoke(&filtered.operation, filtered.kwargs)
            .await
    }

    async fn route_to_master(
        &self,
        request: &OperationRequest,
    ) -> Result<AffectedItems, DispatchError> {
        let cluster = &self.inner.cluster;
        if cluster.current_node_role() == NodeRole::Master {
            return self.execute_local(request).await;
        }

        let master = cluster
            .master_node()
            .ok_or_else(|| DispatchError::remote_unreachable("master", "no master node known"))?;
        debug!(master = %master.name, "Forwarding request to master");
        Ok(cluster.forward(&master, request.clone()).await?)
    }

    /// Execute locally and on every reachable member, then merge
    ///
    /// Results merge in visiting order: this node first, then members as
    /// returned by the cluster client. A member that cannot answer shows up
    /// as a failed entry keyed `node:<name>`.
    #[instrument(name = "dispatcher_broadcast", skip(self, request))]
    async fn broadcast(&self, request: &OperationRequest) -> Result<AffectedItems, DispatchError> {
        let cluster = &self.inner.cluster;
        let filtered = filter_request(request)?;
        let members = cluster.reachable_members().await;
        let forwarded = filtered.rerouted(RoutingMode::Local);

        let (local, remote) = tokio::join!(
            self.inner
                .registry
                .invoke(&filtered.operation, filtered.kwargs.clone()),
            join_all(
                members
                    .iter()
                    .map(|member| cluster.forward(member, forwarded.clone()))
            )
        );

        let mut merged = local?;
        for (member, result) in members.iter().zip(remote) {
            match result {
                Ok(items) => {
                    let ignored = merged.merge(items);
                    if ignored > 0 {
                        debug!(node = %member.name, ignored, "Duplicate entries ignored");
                    }
                }
                Err(e) => {
                    let kind = match &e {
                        ForwardError::Unreachable { .. } => ErrorKind::RemoteUnreachable,
                        ForwardError::Remote { .. } => ErrorKind::Remote,
                    };
                    warn!(node = %member.name, error = %e, "Member failed during broadcast");
                    if let Err(dup) = merged.add_failed_node(&member.name, kind, e.to_string()) {
                        warn!(node = %member.name, error = %dup, "Node already reported as failed");
                    }
                }
            }
        }

        debug!(
            members = members.len(),
            affected = merged.total_affected_items(),
            failed = merged.total_failed_items(),
            "Broadcast merged"
        );
        Ok(merged)
    }
}
