//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 响应结构快照测试
//! - 配置 -> dispatcher -> active response 的端到端测试（mock 队列）
//! - 模拟集群的广播合并与主节点转发

#[cfg(test)]
mod contract_tests {
    use contracts::{AffectedItems, ErrorKind};
    use serde_json::json;

    #[test]
    fn test_response_shape() {
        let mut result = AffectedItems::new(
            "Could not send command to any agent",
            "Could not send command to some agents",
            "Command sent to all agents",
        );
        result.add_success("001").unwrap();
        result
            .add_failed_item("002", ErrorKind::Transport, "connection refused")
            .unwrap();
        result
            .add_failed_item("004", ErrorKind::Transport, "connection refused")
            .unwrap();

        let rendered = result.finalize().unwrap().render(false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "Could not send command to some agents",
                "data": {
                    "affected_items": ["001"],
                    "total_affected_items": 1,
                    "failed_items": [{
                        "error": { "kind": "transport", "message": "connection refused" },
                        "id": ["002", "004"],
                    }],
                    "total_failed_items": 2,
                },
            })
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use active_response::{
        run_command_request, CommandCatalog, CommandFanout, MockConfig, MockTransport, RunCommand,
    };
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ErrorKind, NodeEndpoint, PermissionResolver, PermissionSet, ServiceConfig,
    };
    use dispatcher::{
        DispatchError, Dispatcher, DispatcherConfig, DistributeOutcome, InProcessCluster,
        OperationRegistry, StandaloneCluster, StaticPermissionResolver,
    };
    use observability::DispatchStatsAggregator;

    const CLUSTER_TOML: &str = r#"
[node]
name = "master"
role = "master"

[cluster]
enabled = true

[[cluster.members]]
name = "master"
address = "10.0.0.1"
role = "master"

[[cluster.members]]
name = "worker-1"
address = "10.0.0.2"

[[cluster.members]]
name = "worker-2"
address = "10.0.0.3"

[dispatch]
request_timeout_ms = 2000

[active_response]
commands = ["restart-wazuh", "firewall-drop"]

[rbac]
inventory = ["001", "002", "003"]

[rbac.grants]
admin = ["*"]
ops = ["002"]
"#;

    fn load() -> ServiceConfig {
        ConfigLoader::load_from_str(CLUSTER_TOML, ConfigFormat::Toml).unwrap()
    }

    fn permissions(config: &ServiceConfig, credential: &str) -> PermissionSet {
        StaticPermissionResolver::from_config(&config.rbac)
            .resolve(credential)
            .unwrap()
    }

    fn registry(config: &ServiceConfig, transport: &MockTransport) -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry.register(RunCommand::new(CommandFanout::new(
            transport.clone(),
            CommandCatalog::from_config(&config.active_response),
        )));
        registry
    }

    /// Agents reachable only from the given node: every other id fails
    fn node_transport(connected: &[&str]) -> MockTransport {
        MockTransport::with_config(MockConfig {
            fail_destinations: ["001", "002", "003"]
                .into_iter()
                .filter(|id| !connected.contains(id))
                .map(String::from)
                .collect(),
            ..Default::default()
        })
    }

    fn member(config: &ServiceConfig, name: &str) -> NodeEndpoint {
        config
            .cluster
            .members
            .iter()
            .find(|m| m.name == name)
            .map(|m| NodeEndpoint::new(&m.name, &m.address, m.role))
            .unwrap()
    }

    #[tokio::test]
    async fn test_e2e_partial_failure() {
        let config = load();
        let transport = MockTransport::with_config(MockConfig {
            fail_destinations: vec!["002".to_string()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::builder(StandaloneCluster::new(&config.node.name))
            .config(DispatcherConfig::from(&config.dispatch))
            .registry(registry(&config, &transport))
            .build();

        let request = run_command_request(
            Some(vec!["001".to_string(), "002".to_string()]),
            "restart-wazuh",
            None,
            false,
        )
        .permissions(permissions(&config, "admin"))
        .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.affected_items(), ["001"]);
        assert_eq!(result.total_affected_items(), 1);
        assert_eq!(result.failed_items()["002"].kind, ErrorKind::Transport);
        assert_eq!(
            result.summary().unwrap(),
            "Could not send command to some agents"
        );
        assert_eq!(transport.payloads(), ["restart-wazuh - -"]);
        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.close_count(), 1);

        let mut stats = DispatchStatsAggregator::new();
        stats.record_completed(&result, 1.0);
        assert_eq!(stats.summary().target_failures.get("transport"), Some(&1));
    }

    #[tokio::test]
    async fn test_e2e_permission_filtering() {
        let config = load();
        let transport = MockTransport::new();
        let dispatcher = Dispatcher::builder(StandaloneCluster::new(&config.node.name))
            .registry(registry(&config, &transport))
            .build();

        let request = run_command_request(
            Some(vec!["001".to_string(), "002".to_string(), "003".to_string()]),
            "firewall-drop",
            Some(vec!["-a".to_string(), "10.0.0.9".to_string()]),
            false,
        )
        .permissions(permissions(&config, "ops"))
        .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.affected_items(), ["002"]);
        assert_eq!(transport.sent_to(), ["002"]);
        assert_eq!(transport.payloads(), ["firewall-drop -a 10.0.0.9"]);
        assert_eq!(result.summary().unwrap(), "Command sent to all agents");
    }

    #[tokio::test]
    async fn test_e2e_unknown_credential_denied() {
        let config = load();
        let transport = MockTransport::new();
        let dispatcher = Dispatcher::builder(StandaloneCluster::new(&config.node.name))
            .registry(registry(&config, &transport))
            .build();

        let request = run_command_request(None, "restart-wazuh", None, false)
            .permissions(permissions(&config, "nobody"))
            .build();

        let err = dispatcher.distribute(&request).await.unwrap_err();
        assert!(matches!(err, DispatchError::PermissionDenied { .. }));
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_broadcast_all_agents() {
        let config = load();
        // each node reaches only its own agent
        let master = node_transport(&["001"]);
        let worker_1 = node_transport(&["002"]);
        let worker_2 = node_transport(&["003"]);

        let cluster = InProcessCluster::new(member(&config, "master"))
            .with_peer(member(&config, "worker-1"), registry(&config, &worker_1))
            .with_peer(member(&config, "worker-2"), registry(&config, &worker_2));
        let dispatcher = Dispatcher::builder(cluster)
            .config(DispatcherConfig::from(&config.dispatch))
            .registry(registry(&config, &master))
            .build();

        let request = run_command_request(None, "restart-wazuh", None, false)
            .permissions(permissions(&config, "admin"))
            .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.affected_items(), ["001", "002", "003"]);
        assert!(result.failed_items().is_empty());
        assert_eq!(result.summary().unwrap(), "Command sent to all agents");
        assert_eq!(master.sent_to(), ["001"]);
        assert_eq!(worker_1.sent_to(), ["002"]);
        assert_eq!(worker_2.sent_to(), ["003"]);
        for transport in [&master, &worker_1, &worker_2] {
            assert_eq!(transport.open_count(), 1);
            assert_eq!(transport.close_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_e2e_broadcast_with_unreachable_worker() {
        let config = load();
        let master = node_transport(&["001"]);
        let worker_1 = node_transport(&["002"]);
        let worker_2 = node_transport(&["003"]);

        let cluster = InProcessCluster::new(member(&config, "master"))
            .with_peer(member(&config, "worker-1"), registry(&config, &worker_1))
            .with_peer(member(&config, "worker-2"), registry(&config, &worker_2))
            .with_down_peer("worker-2");
        let dispatcher = Dispatcher::builder(cluster)
            .registry(registry(&config, &master))
            .build();

        let request = run_command_request(None, "restart-wazuh", None, false)
            .permissions(permissions(&config, "admin"))
            .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.affected_items(), ["001", "002"]);
        assert_eq!(result.failed_items()["003"].kind, ErrorKind::Transport);
        assert_eq!(
            result.failed_items()["node:worker-2"].kind,
            ErrorKind::RemoteUnreachable
        );
        assert!(worker_2.sent_to().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_worker_forwards_to_master() {
        let mut config = load();
        config.node.name = "worker-1".to_string();
        config.node.role = contracts::NodeRole::Worker;

        let local = MockTransport::new();
        let master = MockTransport::new();
        let cluster = InProcessCluster::new(member(&config, "worker-1"))
            .with_peer(member(&config, "master"), registry(&config, &master));
        let dispatcher = Dispatcher::builder(cluster)
            .registry(registry(&config, &local))
            .build();

        let request = run_command_request(
            Some(vec!["003".to_string()]),
            "restart-wazuh",
            None,
            false,
        )
        .permissions(permissions(&config, "admin"))
        .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.affected_items(), ["003"]);
        assert_eq!(master.sent_to(), ["003"]);
        assert!(local.sent_to().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_async_request() {
        let config = load();
        let transport = MockTransport::new();
        let dispatcher = Dispatcher::builder(StandaloneCluster::new(&config.node.name))
            .registry(registry(&config, &transport))
            .build();

        let request = run_command_request(
            Some(vec!["001".to_string()]),
            "!custom-script.sh",
            None,
            false,
        )
        .permissions(permissions(&config, "admin"))
        .is_async(true)
        .build();

        let DistributeOutcome::Accepted(handle) = dispatcher.distribute(&request).await.unwrap()
        else {
            panic!("expected an acknowledgment");
        };
        let result = handle.wait().await.unwrap();

        assert_eq!(result.affected_items(), ["001"]);
        assert_eq!(transport.payloads(), ["!custom-script.sh - -"]);
        assert_eq!(dispatcher.metrics().accepted, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_e2e_unix_queue() {
        use active_response::ArQueue;
        use tokio::net::UnixDatagram;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ar");
        let reader = UnixDatagram::bind(&path).unwrap();

        let mut config = load();
        config.active_response.queue_path = path.display().to_string();

        let mut registry = OperationRegistry::new();
        registry.register(RunCommand::new(CommandFanout::new(
            ArQueue::from_config(&config.active_response),
            CommandCatalog::from_config(&config.active_response),
        )));
        let dispatcher = Dispatcher::builder(StandaloneCluster::new(&config.node.name))
            .registry(registry)
            .build();

        let request = run_command_request(
            Some(vec!["002".to_string()]),
            "restart-wazuh",
            None,
            false,
        )
        .permissions(permissions(&config, "ops"))
        .build();

        let result = dispatcher
            .distribute(&request)
            .await
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(result.affected_items(), ["002"]);

        let mut buf = [0u8; 256];
        let n = reader.recv(&mut buf).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&buf[..n]).unwrap(),
            "(msg_to_agent) [] NNS 002 restart-wazuh - -"
        );
    }
}
