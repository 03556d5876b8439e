//! Peripheral wrappers
//!
//! Each wrapper turns a domain intent into an `(opcode, payload)` command and
//! decodes the reply it expects. Wrappers share one [`CommandChannel`] and
//! decide for themselves how to treat transport failures.
//!
//! [`CommandChannel`]: crate::infrastructure::link::CommandChannel

pub mod bot;
pub mod controller;
pub mod error;
pub mod policy;
pub mod request;
pub mod status;

pub use bot::Bot;
pub use controller::Controller;
pub use error::PeripheralError;
pub use policy::{CommandMode, CommandOptions, FailurePolicy, ReadOptions};
pub use status::{ControllerStatus, RequestStatus, StatusTracker};

#[cfg(test)]
pub(crate) mod testing {
    use crate::infrastructure::link::{CommandChannel, LinkError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub opcode: u8,
        /// `None` for fire-and-forget sends
        pub reply_opcode: Option<u8>,
        pub payload: Vec<u8>,
    }

    /// Channel double that records every command and answers waits from a script
    #[derive(Default)]
    pub struct ScriptedChannel {
        sent: Mutex<Vec<Sent>>,
        replies: Mutex<VecDeque<Result<Vec<u8>, LinkError>>>,
        offline: bool,
    }

    impl ScriptedChannel {
        pub fn with_replies(replies: Vec<Result<Vec<u8>, LinkError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        pub fn offline() -> Self {
            Self {
                offline: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandChannel for ScriptedChannel {
        fn send(&self, opcode: u8, payload: &[u8]) -> Result<(), LinkError> {
            if self.offline {
                return Err(LinkError::LinkUnavailable);
            }
            self.sent.lock().unwrap().push(Sent {
                opcode,
                reply_opcode: None,
                payload: payload.to_vec(),
            });
            Ok(())
        }

        async fn send_and_expect(
            &self,
            opcode: u8,
            reply_opcode: u8,
            payload: &[u8],
            timeout: Duration,
        ) -> Result<Vec<u8>, LinkError> {
            if self.offline {
                return Err(LinkError::LinkUnavailable);
            }
            self.sent.lock().unwrap().push(Sent {
                opcode,
                reply_opcode: Some(reply_opcode),
                payload: payload.to_vec(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LinkError::ResponseTimeout {
                    opcode: reply_opcode,
                    timeout,
                }))
        }
    }
}
