//! Messaging between controllers
//!
//! ```text
//! Send     : 0x20 0x06 0x01 <message>
//! Received : 0x20 0x06 0x02  -> last reply byte is the message
//! ```

use crate::domain::peripherals::request::{self, last_byte};
use crate::domain::peripherals::{CommandOptions, PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

const OPCODE: u8 = 0x20;
const SELECTOR: u8 = 0x06;
const SEND: u8 = 0x01;
const RECEIVED: u8 = 0x02;

pub struct Messaging {
    link: Arc<dyn CommandChannel>,
    read: ReadOptions,
    command: CommandOptions,
}

impl Messaging {
    pub fn new(link: Arc<dyn CommandChannel>, read: ReadOptions, command: CommandOptions) -> Self {
        Self {
            link,
            read,
            command,
        }
    }

    pub async fn send(&self, message: u8) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), OPCODE, &[SELECTOR, SEND, message], self.command)
            .await
    }

    /// Last message received; `None` when the read failed under the sentinel policy
    pub async fn received(&self) -> Result<Option<u8>, PeripheralError> {
        request::read(
            self.link.as_ref(),
            OPCODE,
            &[SELECTOR, RECEIVED],
            self.read,
            None,
            |reply| last_byte(OPCODE, reply).map(Some),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[tokio::test]
    async fn test_send_message() {
        let channel = Arc::new(ScriptedChannel::default());
        let messaging = Messaging::new(channel.clone(), ReadOptions::default(), CommandOptions::default());

        messaging.send(0x2a).await.unwrap();
        let sent = channel.sent();
        assert_eq!(sent[0].opcode, 0x20);
        assert_eq!(sent[0].reply_opcode, None);
        assert_eq!(sent[0].payload, vec![0x06, 0x01, 0x2a]);
    }

    #[tokio::test]
    async fn test_received_message() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![Ok(vec![0x06, 0x02, 0x05])]));
        let messaging = Messaging::new(channel, ReadOptions::default(), CommandOptions::default());
        assert_eq!(messaging.received().await, Ok(Some(0x05)));
        assert_eq!(messaging.received().await, Ok(None));
    }
}
