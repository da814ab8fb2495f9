//! AsyncHandle - acknowledgment for a request scheduled in the background

use contracts::AffectedItems;
use tokio::task::JoinHandle;
use tracing::{error, instrument};

use crate::error::DispatchError;

/// Handle to a scheduled dispatch
///
/// Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct AsyncHandle {
    task_id: u64,
    operation: String,
    task: JoinHandle<Result<AffectedItems, DispatchError>>,
}

impl AsyncHandle {
    pub(crate) fn new(
        task_id: u64,
        operation: impl Into<String>,
        task: JoinHandle<Result<AffectedItems, DispatchError>>,
    ) -> Self {
        Self {
            task_id,
            operation: operation.into(),
            task,
        }
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the scheduled call to finish
    ///
    /// # Errors
    /// The call's own error, or `TaskFailed` if the task panicked or was aborted
    #[instrument(
        name = "async_handle_wait",
        skip(self),
        fields(task_id = self.task_id, operation = %self.operation)
    )]
    pub async fn wait(self) -> Result<AffectedItems, DispatchError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!(task_id = self.task_id, error = ?e, "Scheduled task failed");
                Err(DispatchError::TaskFailed {
                    task_id: self.task_id,
                    message: e.to_string(),
                })
            }
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
