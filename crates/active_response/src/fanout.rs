//! CommandFanout - sends one command to many agents
//!
//! One queue connection per fan-out, one send per agent. A failing agent is
//! recorded in the result and the loop moves on.

use contracts::{AffectedItems, CommandMessage, ErrorKind, QueueTransport, TransportError};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CommandCatalog;
use crate::error::{ActiveResponseError, Result};

/// Agent id of the manager itself
const MANAGER_ID: &str = "000";

const NONE_MSG: &str = "Could not send command to any agent";
const SOME_MSG: &str = "Could not send command to some agents";
const ALL_MSG: &str = "Command sent to all agents";

/// Active response command fan-out
pub struct CommandFanout<T: QueueTransport> {
    transport: T,
    catalog: CommandCatalog,
}

impl<T: QueueTransport + Sync> CommandFanout<T> {
    pub fn new(transport: T, catalog: CommandCatalog) -> Self {
        Self { transport, catalog }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Send `command` to every agent in `target_list`
    ///
    /// Agents are processed in input order. Repeated ids are sent once and
    /// recorded once, so every distinct id of `target_list` ends up either
    /// succeeded or failed and the counts add up to the number of distinct ids.
    ///
    /// # Errors
    /// Call-level only: empty target list, invalid or unknown command, queue
    /// cannot be opened. Per-agent failures end up in the returned result.
    #[instrument(
        name = "active_response_run_command",
        skip(self, target_list, arguments),
        fields(transport = %self.transport.name(), targets = target_list.len())
    )]
    pub async fn run_command(
        &self,
        target_list: &[String],
        command: &str,
        arguments: Option<Vec<String>>,
        custom: bool,
    ) -> Result<AffectedItems> {
        if target_list.is_empty() {
            return Err(ActiveResponseError::EmptyTargetList);
        }
        let message = self.catalog.create_message(command, arguments, custom)?;

        let mut result = AffectedItems::new(NONE_MSG, SOME_MSG, ALL_MSG);
        let mut session = QueueSession::open(&self.transport).await?;
        let mut seen = HashSet::new();

        for agent_id in target_list {
            if !seen.insert(agent_id.as_str()) {
                debug!(agent = %agent_id, "Repeated agent id skipped");
                continue;
            }

            if let Err(reason) = check_agent_id(agent_id) {
                warn!(agent = %agent_id, reason, "Invalid target");
                result.add_failed_item(agent_id.as_str(), ErrorKind::InvalidTarget, reason)?;
                continue;
            }

            match session.send(agent_id, &message).await {
                Ok(()) => {
                    debug!(agent = %agent_id, "Command queued");
                    result.add_success(agent_id.as_str())?;
                }
                Err(e) => {
                    warn!(agent = %agent_id, error = %e, "Send failed");
                    result.add_failed_item(agent_id.as_str(), ErrorKind::Transport, e.to_string())?;
                }
            }
        }

        session.close();

        info!(
            command = %message.name(),
            affected = result.total_affected_items(),
            failed = result.total_failed_items(),
            "Active response fan-out finished"
        );

        Ok(result)
    }
}

/// Agent ids are numeric and the manager cannot run active responses
fn check_agent_id(agent_id: &str) -> std::result::Result<(), &'static str> {
    if agent_id.is_empty() || !agent_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err("invalid agent id");
    }
    if agent_id == MANAGER_ID {
        return Err("active response is not available for the manager (agent 000)");
    }
    Ok(())
}

/// Open queue connection, released exactly once
///
/// Dropping the session closes the connection, so a cancelled fan-out still
/// releases it.
struct QueueSession<'a, T: QueueTransport> {
    transport: &'a T,
    handle: Option<T::Handle>,
}

impl<'a, T: QueueTransport> QueueSession<'a, T> {
    async fn open(transport: &'a T) -> Result<Self> {
        let handle = transport
            .open()
            .await
            .map_err(|e| ActiveResponseError::QueueUnavailable {
                message: e.to_string(),
            })?;
        Ok(Self {
            transport,
            handle: Some(handle),
        })
    }

    async fn send(
        &mut self,
        destination: &str,
        message: &CommandMessage,
    ) -> std::result::Result<(), TransportError> {
        let handle = self.handle.as_mut().ok_or(TransportError::Closed)?;
        self.transport.send(handle, destination, message).await
    }

    fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.transport.close(handle);
        }
    }
}

impl<T: QueueTransport> Drop for QueueSession<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}
