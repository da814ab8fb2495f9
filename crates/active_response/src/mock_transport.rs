//! Mock 队列传输
//!
//! 用于单元测试的 mock 实现，支持注入失败场景。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{CommandMessage, QueueTransport, TransportError};
use tracing::instrument;

/// Mock 传输配置
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// 发送应该失败的目标 IDs
    pub fail_destinations: Vec<String>,
    /// open() 是否失败
    pub fail_open: bool,
    /// 每次发送前的延迟
    pub send_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    /// (destination, payload)
    sent: Mutex<Vec<(String, String)>>,
}

/// Mock 队列传输
///
/// Clone 共享同一份计数器，便于在交给 dispatcher 之后继续观察。
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    /// 配置（可注入失败场景）
    config: MockConfig,
    state: Arc<MockState>,
}

/// Mock 连接句柄
#[derive(Debug)]
pub struct MockHandle {
    id: usize,
}

impl MockTransport {
    /// 创建默认 mock 传输
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 传输
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            state: Arc::new(MockState::default()),
        }
    }

    /// open() 调用次数
    pub fn open_count(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// close() 调用次数
    pub fn close_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// 成功发送的目标，按发送顺序
    pub fn sent_to(&self) -> Vec<String> {
        self.sent().into_iter().map(|(dest, _)| dest).collect()
    }

    /// 成功发送的 payload，按发送顺序
    pub fn payloads(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, payload)| payload).collect()
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueTransport for MockTransport {
    type Handle = MockHandle;

    fn name(&self) -> &str {
        "mock"
    }

    #[instrument(name = "mock_transport_open", skip(self))]
    async fn open(&self) -> Result<MockHandle, TransportError> {
        if self.config.fail_open {
            return Err(TransportError::unreachable("queue", "mock open failure"));
        }
        let id = self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle { id })
    }

    #[instrument(name = "mock_transport_send", skip(self, handle, message))]
    async fn send(
        &self,
        handle: &mut MockHandle,
        destination: &str,
        message: &CommandMessage,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.config.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_destinations.iter().any(|d| d == destination) {
            return Err(TransportError::unreachable(
                destination,
                format!("mock failure on connection {}", handle.id),
            ));
        }
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((destination.to_string(), message.payload()));
        Ok(())
    }

    fn close(&self, _handle: MockHandle) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}
