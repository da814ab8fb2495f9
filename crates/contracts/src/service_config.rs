//! ServiceConfig - Config Loader output
//!
//! Node identity, cluster members, dispatch timing, active response queue,
//! permission grants and logging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

use crate::NodeRole;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Local node identity
    #[validate(nested)]
    pub node: NodeConfig,

    /// Cluster members
    #[serde(default)]
    #[validate(nested)]
    pub cluster: ClusterConfig,

    /// Dispatch timing
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// Active response queue and command catalog
    #[serde(default)]
    #[validate(nested)]
    pub active_response: ActiveResponseConfig,

    /// Static permission grants
    #[serde(default)]
    pub rbac: RbacConfig,

    /// Logging and metrics
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local node identity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeConfig {
    #[validate(length(min = 1, message = "node name cannot be empty"))]
    pub name: String,

    #[serde(default)]
    pub role: NodeRole,
}

/// Cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ClusterConfig {
    /// Whether the node runs as part of a cluster
    #[serde(default)]
    pub enabled: bool,

    /// All members, the local node included
    #[serde(default)]
    #[validate(nested)]
    pub members: Vec<MemberConfig>,
}

/// One cluster member
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MemberConfig {
    #[validate(length(min = 1, message = "member name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "member address cannot be empty"))]
    pub address: String,

    #[serde(default = "default_member_role")]
    pub role: NodeRole,
}

fn default_member_role() -> NodeRole {
    NodeRole::Worker
}

/// Dispatch timing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Call timeout, ignored when the caller waits for completion
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1, message = "request_timeout_ms must be > 0"))]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Active response queue and command catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActiveResponseConfig {
    /// Unix datagram socket of the active response queue
    #[serde(default = "default_queue_path")]
    #[validate(length(min = 1, message = "queue_path cannot be empty"))]
    pub queue_path: String,

    /// Largest encoded message the queue accepts
    #[serde(default = "default_max_message_size")]
    #[validate(range(min = 64, message = "max_message_size must be >= 64"))]
    pub max_message_size: usize,

    /// Commands that may be sent without the script marker
    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
}

fn default_queue_path() -> String {
    "/var/ossec/queue/alerts/ar".to_string()
}

fn default_max_message_size() -> usize {
    6144
}

fn default_commands() -> Vec<String> {
    ["restart-wazuh", "firewall-drop", "host-deny", "disable-account", "route-null"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ActiveResponseConfig {
    fn default() -> Self {
        Self {
            queue_path: default_queue_path(),
            max_message_size: default_max_message_size(),
            commands: default_commands(),
        }
    }
}

/// Static permission grants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Every known target identifier
    #[serde(default)]
    pub inventory: Vec<String>,

    /// Credential -> granted target identifiers (`*` grants the inventory)
    #[serde(default)]
    pub grants: BTreeMap<String, Vec<String>>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_log_level")]
    pub level: String,

    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
            metrics_port: None,
        }
    }
}
