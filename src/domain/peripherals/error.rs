use super::status::RequestStatus;
use crate::infrastructure::link::LinkError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeripheralError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("reply for opcode {opcode:#04x} too short: {actual} bytes, need {expected}")]
    ShortReply {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("request rejected by controller: {0:?}")]
    Rejected(RequestStatus),
}
