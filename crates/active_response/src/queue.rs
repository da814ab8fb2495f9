//! ArQueue - active response queue over a Unix datagram socket
//!
//! Frame layout: `(msg_to_agent) [] NNS <agent_id> <payload>`, one datagram
//! per agent.

use contracts::{ActiveResponseConfig, CommandMessage, QueueTransport, TransportError};
use std::path::{Path, PathBuf};
use tokio::net::UnixDatagram;
use tracing::{debug, instrument};

/// Frame prefix understood by the queue reader
const FRAME_HEADER: &str = "(msg_to_agent) []";

/// Flags: not all agents, no restart, specific agent
const SPECIFIC_AGENT_FLAGS: &str = "NNS";

/// Active response queue transport
#[derive(Debug, Clone)]
pub struct ArQueue {
    path: PathBuf,
    max_message_size: usize,
}

impl ArQueue {
    pub fn new(path: impl Into<PathBuf>, max_message_size: usize) -> Self {
        Self {
            path: path.into(),
            max_message_size,
        }
    }

    pub fn from_config(config: &ActiveResponseConfig) -> Self {
        Self::new(&config.queue_path, config.max_message_size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode the datagram addressed to `agent_id`
    pub fn encode(agent_id: &str, message: &CommandMessage) -> String {
        format!(
            "{FRAME_HEADER} {SPECIFIC_AGENT_FLAGS} {agent_id} {}",
            message.payload()
        )
    }
}

impl QueueTransport for ArQueue {
    type Handle = UnixDatagram;

    fn name(&self) -> &str {
        "ar-queue"
    }

    #[instrument(name = "ar_queue_open", skip(self), fields(path = %self.path.display()))]
    async fn open(&self) -> Result<UnixDatagram, TransportError> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(&self.path)?;
        debug!(path = %self.path.display(), "AR queue connected");
        Ok(socket)
    }

    #[instrument(name = "ar_queue_send", skip(self, handle, message))]
    async fn send(
        &self,
        handle: &mut UnixDatagram,
        destination: &str,
        message: &CommandMessage,
    ) -> Result<(), TransportError> {
        let frame = Self::encode(destination, message);
        if frame.len() > self.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: frame.len(),
                max: self.max_message_size,
            });
        }
        handle
            .send(frame.as_bytes())
            .await
            .map_err(|e| TransportError::unreachable(destination, e.to_string()))?;
        Ok(())
    }

    fn close(&self, handle: UnixDatagram) {
        drop(handle);
        debug!(path = %self.path.display(), "AR queue closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let msg = CommandMessage::new("restart-wazuh", None, false).unwrap();
        assert_eq!(
            ArQueue::encode("001", &msg),
            "(msg_to_agent) [] NNS 001 restart-wazuh - -"
        );
    }

    #[tokio::test]
    async fn test_send_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ar");
        let reader = UnixDatagram::bind(&path).unwrap();

        let queue = ArQueue::new(&path, 6144);
        let msg = CommandMessage::new("!block.sh", Some(vec!["10.0.0.1".to_string()]), false)
            .unwrap();

        let mut handle = queue.open().await.unwrap();
        queue.send(&mut handle, "002", &msg).await.unwrap();
        queue.close(handle);

        let mut buf = vec![0u8; 1024];
        let n = reader.recv(&mut buf).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&buf[..n]).unwrap(),
            "(msg_to_agent) [] NNS 002 !block.sh 10.0.0.1"
        );
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ar");
        let _reader = UnixDatagram::bind(&path).unwrap();

        let queue = ArQueue::new(&path, 64);
        let msg = CommandMessage::new("restart-wazuh", Some(vec!["x".repeat(100)]), false)
            .unwrap();

        let mut handle = queue.open().await.unwrap();
        let err = queue.send(&mut handle, "001", &msg).await.unwrap_err();
        assert!(matches!(err, TransportError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_open_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ArQueue::new(dir.path().join("missing"), 6144);
        assert!(queue.open().await.is_err());
    }
}
