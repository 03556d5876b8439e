use super::error::LinkError;
use async_trait::async_trait;
use std::time::Duration;

/// Capability handed to peripheral wrappers: send a command, or send one and
/// wait for the reply frame that answers it.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    fn send(&self, opcode: u8, payload: &[u8]) -> Result<(), LinkError>;

    /// Wait for a reply carrying the same opcode as the request
    async fn send_and_wait(
        &self,
        opcode: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, LinkError> {
        self.send_and_expect(opcode, opcode, payload, timeout).await
    }

    /// Wait for a reply on `reply_opcode`, for requests answered on a
    /// different opcode (status acknowledgements)
    async fn send_and_expect(
        &self,
        opcode: u8,
        reply_opcode: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, LinkError>;
}
