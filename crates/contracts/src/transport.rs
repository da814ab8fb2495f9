//! QueueTransport trait - outbound command queue interface

use crate::{CommandMessage, TransportError};

/// Outbound queue used to reach agents
///
/// A fan-out opens one handle, sends once per destination and closes the
/// handle exactly once. `close` is synchronous so it can run from a drop
/// guard when the fan-out is cancelled.
#[trait_variant::make(QueueTransport: Send)]
pub trait LocalQueueTransport {
    /// Open connection
    type Handle: Send;

    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Acquire a connection
    async fn open(&self) -> Result<Self::Handle, TransportError>;

    /// Enqueue `message` addressed to `destination`
    ///
    /// # Errors
    /// Failure specific to this destination; the handle stays usable
    async fn send(
        &self,
        handle: &mut Self::Handle,
        destination: &str,
        message: &CommandMessage,
    ) -> Result<(), TransportError>;

    /// Release a connection
    fn close(&self, handle: Self::Handle);
}
