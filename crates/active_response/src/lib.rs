//! # Active Response
//!
//! Sends an active response command to agents through the outbound queue.
//!
//! 负责：
//! - 校验命令 (catalog / script marker)
//! - 每个 agent 发送一次，单个 agent 失败不影响其余
//! - 队列连接每次 fan-out 打开一次、释放一次
//! - 作为 `active_response.run_command` 注册到 dispatcher

mod catalog;
mod error;
mod fanout;
mod mock_transport;
mod operation;
#[cfg(unix)]
mod queue;

pub use catalog::CommandCatalog;
pub use contracts::CommandMessage;
pub use error::{ActiveResponseError, Result};
pub use fanout::CommandFanout;
pub use mock_transport::{MockConfig, MockHandle, MockTransport};
pub use operation::{run_command_request, RunCommand, AGENT_LIST, RUN_COMMAND};
#[cfg(unix)]
pub use queue::ArQueue;
