//! `run` command implementation.

use std::time::Instant;

use active_response::{
    run_command_request, CommandCatalog, CommandFanout, MockTransport, RunCommand, RUN_COMMAND,
};
use anyhow::{Context, Result};
use contracts::{
    AffectedItems, ClusterClient, OperationRequest, PermissionResolver, QueueTransport,
    ServiceConfig,
};
use dispatcher::{
    DispatchError, Dispatcher, DispatcherConfig, DistributeOutcome, InProcessCluster,
    OperationRegistry, StandaloneCluster, StaticPermissionResolver,
};
use observability::DispatchStatsAggregator;
use serde_json::json;
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::error::{CliError, Result as CliResult};

/// What a run prints: the response lines plus the dispatch statistics
struct RunOutput {
    lines: Vec<String>,
    stats: DispatchStatsAggregator,
}

/// Execute the `run` command
pub async fn run_command(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let config = load_config(&args.config)?;

    if let Some(port) = args.metrics_port.or(config.logging.metrics_port) {
        observability::init_metrics_only(port)?;
    }

    let output = execute(&config, args).await?;
    for line in &output.lines {
        println!("{}", line);
    }
    if args.stats {
        eprint!("{}", output.stats.summary());
    }
    Ok(())
}

async fn execute(config: &ServiceConfig, args: &RunArgs) -> Result<RunOutput> {
    let permissions = StaticPermissionResolver::from_config(&config.rbac)
        .resolve(&args.credential)
        .context("Failed to resolve permissions")?;

    let request = build_request(args).permissions(permissions).build();

    info!(
        node = %config.node.name,
        command = %args.command,
        mode = %request.request_type,
        cluster = config.cluster.enabled,
        "Configuration loaded"
    );

    if args.simulate {
        info!("Simulated queue, no command leaves this process");
        let registry = registry_for(MockTransport::new(), config);
        if config.cluster.enabled {
            let peers = registry_for(MockTransport::new(), config);
            let cluster = InProcessCluster::from_config(config, &peers);
            return dispatch(build_dispatcher(cluster, registry, config), &request).await;
        }
        let cluster = StandaloneCluster::new(&config.node.name);
        return dispatch(build_dispatcher(cluster, registry, config), &request).await;
    }

    if config.cluster.enabled {
        warn!("Cluster forwarding is only available with --simulate, running as a standalone node");
    }
    let registry = registry_for(queue_transport(config)?, config);
    let cluster = StandaloneCluster::new(&config.node.name);
    dispatch(build_dispatcher(cluster, registry, config), &request).await
}

fn build_request(args: &RunArgs) -> contracts::OperationRequestBuilder {
    let arguments = (!args.arguments.is_empty()).then(|| args.arguments.clone());
    run_command_request(args.agents.clone(), &args.command, arguments, args.custom)
        .is_async(args.is_async)
        .wait_for_complete(args.wait_for_complete)
        .pretty(args.pretty)
}

#[cfg(unix)]
fn queue_transport(config: &ServiceConfig) -> CliResult<active_response::ArQueue> {
    let queue = active_response::ArQueue::from_config(&config.active_response);
    info!(path = %queue.path().display(), "Using agent queue");
    Ok(queue)
}

#[cfg(not(unix))]
fn queue_transport(_config: &ServiceConfig) -> CliResult<MockTransport> {
    Err(CliError::QueueUnsupported)
}

fn registry_for<T>(transport: T, config: &ServiceConfig) -> OperationRegistry
where
    T: QueueTransport + Sync + 'static,
{
    let catalog = CommandCatalog::from_config(&config.active_response);
    let mut registry = OperationRegistry::new();
    registry.register(RunCommand::new(CommandFanout::new(transport, catalog)));
    registry
}

fn build_dispatcher<C: ClusterClient + 'static>(
    cluster: C,
    registry: OperationRegistry,
    config: &ServiceConfig,
) -> Dispatcher<C> {
    Dispatcher::builder(cluster)
        .config(DispatcherConfig::from(&config.dispatch))
        .registry(registry)
        .build()
}

async fn dispatch<C: ClusterClient + 'static>(
    dispatcher: Dispatcher<C>,
    request: &OperationRequest,
) -> Result<RunOutput> {
    let mut output = RunOutput {
        lines: Vec::new(),
        stats: DispatchStatsAggregator::new(),
    };
    let started = Instant::now();

    let result = match dispatcher.distribute(request).await {
        Ok(DistributeOutcome::Completed(items)) => Ok(items),
        Ok(DistributeOutcome::Accepted(handle)) => {
            let task_id = handle.task_id();
            output.lines.push(
                json!({ "message": "Request accepted", "task_id": task_id }).to_string(),
            );
            // the runtime goes away with the process, so finish the task here
            let result = handle.wait().await;
            info!(task_id, ok = result.is_ok(), "Scheduled request finished");
            result
        }
        Err(e) => Err(e),
    };
    let items = record(request, result, started, &mut output.stats)?;

    let response = items.finalize().map_err(CliError::from)?;
    output
        .lines
        .push(response.render(request.pretty).map_err(CliError::from)?);
    Ok(output)
}

fn record(
    request: &OperationRequest,
    result: std::result::Result<AffectedItems, DispatchError>,
    started: Instant,
    stats: &mut DispatchStatsAggregator,
) -> CliResult<AffectedItems> {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(items) => {
            observability::record_distribute(&request.request_type, "ok", elapsed_ms);
            observability::record_fanout(RUN_COMMAND, &items);
            stats.record_completed(&items, elapsed_ms);
            Ok(items)
        }
        Err(e) => {
            observability::record_distribute(&request.request_type, e.kind(), elapsed_ms);
            stats.record_error(e.kind(), elapsed_ms);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use config_loader::{ConfigFormat, ConfigLoader};
    use serde_json::Value;

    const STANDALONE: &str = r#"
        [node]
        name = "manager"

        [active_response]
        commands = ["restart-wazuh", "firewall-drop"]

        [rbac]
        inventory = ["001", "002", "003"]

        [rbac.grants]
        admin = ["*"]
        ops = ["002"]
    "#;

    const CLUSTER: &str = r#"
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

        [rbac]
        inventory = ["001", "002"]

        [rbac.grants]
        admin = ["*"]
    "#;

    fn config(content: &str) -> ServiceConfig {
        ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap()
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["ar-dispatch", "run", "--simulate"]
            .into_iter()
            .chain(extra.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    #[tokio::test]
    async fn test_simulated_run_reports_per_agent_failures() {
        let args = run_args(&[
            "--credential",
            "admin",
            "--command",
            "restart-wazuh",
            "--agents",
            "001,000",
        ]);
        let output = execute(&config(STANDALONE), &args).await.unwrap();

        assert_eq!(output.lines.len(), 1);
        let response = parse(&output.lines[0]);
        assert_eq!(response["data"]["affected_items"][0], "001");
        assert_eq!(response["data"]["total_failed_items"], 1);
        assert_eq!(
            response["data"]["failed_items"][0]["error"]["kind"],
            "invalid_target"
        );

        let summary = output.stats.summary();
        assert_eq!(summary.completed_calls, 1);
        assert_eq!(summary.total_affected, 1);
        assert_eq!(summary.target_failures["invalid_target"], 1);
    }

    #[tokio::test]
    async fn test_simulated_run_filters_by_credential() {
        let args = run_args(&[
            "--credential",
            "ops",
            "--command",
            "restart-wazuh",
            "--agents",
            "001,002,003",
        ]);
        let output = execute(&config(STANDALONE), &args).await.unwrap();

        let response = parse(&output.lines[0]);
        assert_eq!(response["data"]["affected_items"], serde_json::json!(["002"]));
        assert_eq!(response["data"]["total_failed_items"], 0);
    }

    #[tokio::test]
    async fn test_unknown_credential_is_denied() {
        let args = run_args(&["--credential", "nobody", "--command", "restart-wazuh"]);
        let err = execute(&config(STANDALONE), &args).await.err().unwrap();

        let cli_error = err.downcast_ref::<CliError>().unwrap();
        assert!(matches!(
            cli_error,
            CliError::Dispatch {
                kind: "permission_denied",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_async_run_prints_ack_then_response() {
        let args = run_args(&[
            "--credential",
            "admin",
            "--command",
            "firewall-drop",
            "--agents",
            "001,002",
            "--async",
        ]);
        let output = execute(&config(STANDALONE), &args).await.unwrap();

        assert_eq!(output.lines.len(), 2);
        let ack = parse(&output.lines[0]);
        assert_eq!(ack["message"], "Request accepted");
        assert_eq!(ack["task_id"], 1);
        let response = parse(&output.lines[1]);
        assert_eq!(response["data"]["total_affected_items"], 2);
    }

    #[tokio::test]
    async fn test_simulated_cluster_broadcast() {
        let args = run_args(&["--credential", "admin", "--command", "restart-wazuh"]);
        let output = execute(&config(CLUSTER), &args).await.unwrap();

        let response = parse(&output.lines[0]);
        assert_eq!(
            response["data"]["affected_items"],
            serde_json::json!(["001", "002"])
        );
        assert_eq!(response["data"]["total_failed_items"], 0);
    }
}
