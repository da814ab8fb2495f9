//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ar-dispatch - Active response dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "ar-dispatch",
    author,
    version,
    about = "Send active response commands to agents",
    long_about = "Routes an active response command through the dispatcher.\n\n\
                  Resolves the caller's permissions, routes the request to the \n\
                  master or to every cluster node, sends one command per agent \n\
                  and prints the aggregated per-agent result."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "AR_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "AR_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an active response command on agents
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "AR_DISPATCH_CONFIG")]
    pub config: PathBuf,

    /// Credential whose grants limit the reachable agents
    #[arg(long, env = "AR_DISPATCH_CREDENTIAL")]
    pub credential: String,

    /// Target agent ids; omit to target every permitted agent on every node
    #[arg(short, long, value_delimiter = ',')]
    pub agents: Option<Vec<String>>,

    /// Command name (prefix with '!' for a script reference)
    #[arg(long)]
    pub command: String,

    /// Command argument, repeatable
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub arguments: Vec<String>,

    /// Treat the command as a custom script
    #[arg(long)]
    pub custom: bool,

    /// Disable the request timeout
    #[arg(long)]
    pub wait_for_complete: bool,

    /// Schedule the request and print the task id instead of waiting
    #[arg(long = "async")]
    pub is_async: bool,

    /// Indent the JSON response
    #[arg(long)]
    pub pretty: bool,

    /// Send through an in-memory queue instead of the agent queue socket
    #[arg(long)]
    pub simulate: bool,

    /// Print a dispatch summary to stderr after the response
    #[arg(long)]
    pub stats: bool,

    /// Metrics server port, overrides `[logging] metrics_port`
    #[arg(long, env = "AR_DISPATCH_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show RBAC grants
    #[arg(long)]
    pub grants: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for contracts::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
