//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    node: NodeInfo,
    cluster: ClusterInfo,
    dispatch: DispatchInfo,
    active_response: ActiveResponseInfo,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    grants: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct NodeInfo {
    name: String,
    role: String,
}

#[derive(Serialize)]
struct ClusterInfo {
    enabled: bool,
    members: Vec<MemberInfo>,
}

#[derive(Serialize)]
struct MemberInfo {
    name: String,
    address: String,
    role: String,
}

#[derive(Serialize)]
struct DispatchInfo {
    request_timeout_ms: u64,
}

#[derive(Serialize)]
struct ActiveResponseInfo {
    queue_path: String,
    max_message_size: usize,
    commands: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &ServiceConfig, args: &InfoArgs) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        node: NodeInfo {
            name: config.node.name.clone(),
            role: format!("{:?}", config.node.role),
        },
        cluster: ClusterInfo {
            enabled: config.cluster.enabled,
            members: config
                .cluster
                .members
                .iter()
                .map(|m| MemberInfo {
                    name: m.name.clone(),
                    address: m.address.clone(),
                    role: format!("{:?}", m.role),
                })
                .collect(),
        },
        dispatch: DispatchInfo {
            request_timeout_ms: config.dispatch.request_timeout_ms,
        },
        active_response: ActiveResponseInfo {
            queue_path: config.active_response.queue_path.clone(),
            max_message_size: config.active_response.max_message_size,
            commands: config.active_response.commands.clone(),
        },
        grants: if args.grants {
            config.rbac.grants.clone()
        } else {
            BTreeMap::new()
        },
    }
}

fn print_config_info(config: &ServiceConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Active Response Dispatcher                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🖥  Node");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Name: {}", config.node.name);
    println!("   └─ Role: {:?}", config.node.role);

    let members = &config.cluster.members;
    if config.cluster.enabled {
        println!("\n🌐 Cluster ({} members)", members.len());
        for (i, member) in members.iter().enumerate() {
            let prefix = if i == members.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} @ {} ({:?})",
                prefix, member.name, member.address, member.role
            );
        }
    } else {
        println!("\n🌐 Cluster: disabled");
    }

    println!("\n⚙️  Dispatch");
    println!(
        "   └─ Request timeout: {} ms",
        config.dispatch.request_timeout_ms
    );

    let ar = &config.active_response;
    println!("\n📤 Active Response");
    println!("   ├─ Queue: {}", ar.queue_path);
    println!("   ├─ Max message size: {} bytes", ar.max_message_size);
    println!("   └─ Commands ({}):", ar.commands.len());
    for (i, command) in ar.commands.iter().enumerate() {
        let prefix = if i == ar.commands.len() - 1 { "└─" } else { "├─" };
        println!("        {} {}", prefix, command);
    }

    if args.grants && !config.rbac.grants.is_empty() {
        println!("\n🔑 Grants ({})", config.rbac.grants.len());
        let count = config.rbac.grants.len();
        for (i, (credential, targets)) in config.rbac.grants.iter().enumerate() {
            let prefix = if i == count - 1 { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, credential, targets.join(", "));
        }
    }

    println!();
}
