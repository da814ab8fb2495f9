//! RunCommand - dispatcher entry for the active response fan-out

use async_trait::async_trait;
use contracts::{
    AffectedItems, ContractError, Kwargs, KwargsExt, Operation, OperationRequest,
    OperationRequestBuilder, QueueTransport, RoutingMode,
};

use crate::fanout::CommandFanout;

/// Registry name of the operation
pub const RUN_COMMAND: &str = "active_response.run_command";

/// Keyword argument holding the agent list
pub const AGENT_LIST: &str = "agent_list";

/// Run an active response command on agents
///
/// Keyword arguments: `agent_list` (list of ids), `command`, optional
/// `arguments` (list of strings) and optional `custom` (bool).
pub struct RunCommand<T: QueueTransport> {
    fanout: CommandFanout<T>,
}

impl<T: QueueTransport + Sync> RunCommand<T> {
    pub fn new(fanout: CommandFanout<T>) -> Self {
        Self { fanout }
    }

    pub fn fanout(&self) -> &CommandFanout<T> {
        &self.fanout
    }
}

#[async_trait]
impl<T> Operation for RunCommand<T>
where
    T: QueueTransport + Sync + 'static,
{
    fn name(&self) -> &str {
        RUN_COMMAND
    }

    async fn execute(&self, kwargs: Kwargs) -> Result<AffectedItems, ContractError> {
        let agents = kwargs
            .str_list(AGENT_LIST)?
            .ok_or_else(|| ContractError::invalid_argument(AGENT_LIST, "missing"))?;
        let command = kwargs.required_str("command")?;
        let arguments = kwargs.str_list("arguments")?;
        let custom = kwargs.bool_or("custom", false)?;

        self.fanout
            .run_command(&agents, command, arguments, custom)
            .await
            .map_err(Into::into)
    }
}

/// Start a run-command request
///
/// `None` targets every agent the caller may act upon and is routed as a
/// cluster broadcast; an explicit list goes through the master.
pub fn run_command_request(
    agents: Option<Vec<String>>,
    command: impl Into<String>,
    arguments: Option<Vec<String>>,
    custom: bool,
) -> OperationRequestBuilder {
    let command: String = command.into();
    let builder = OperationRequest::builder(RUN_COMMAND)
        .kwarg("command", command)
        .kwarg("custom", custom);
    let builder = match arguments {
        Some(arguments) => builder.kwarg("arguments", arguments),
        None => builder,
    };
    match agents {
        Some(agents) => builder
            .targets(AGENT_LIST, agents)
            .routing(RoutingMode::DistributedMaster),
        None => builder
            .all_targets(AGENT_LIST)
            .routing(RoutingMode::DistributedBroadcast),
    }
}
