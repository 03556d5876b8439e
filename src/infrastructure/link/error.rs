//! Link error types

use std::time::Duration;
use thiserror::Error;

/// Structural problems found while decoding inbound bytes or encoding outbound frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("no data")]
    Empty,
    #[error("invalid packet header {0:#04x}")]
    InvalidHeader(u8),
    #[error("escape byte at end of packet")]
    UnexpectedEnd,
    #[error("invalid escape sequence 0xfd {0:#04x}")]
    InvalidEscape(u8),
    #[error("packet body too short ({0} bytes)")]
    TooShort(usize),
    #[error("frame too long for length byte ({0} bytes)")]
    TooLong(usize),
    #[error("declared length {declared} does not match body length {actual}")]
    LengthMismatch { declared: u8, actual: usize },
    #[error("notification is neither a packet nor UTF-8 text")]
    InvalidText,
    #[error("crc mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    InvalidCrc { expected: u16, computed: u16 },
}

/// Errors surfaced by the command/response link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    #[error("no reply for opcode {opcode:#04x} within {timeout:?}")]
    ResponseTimeout { opcode: u8, timeout: Duration },

    #[error("link unavailable")]
    LinkUnavailable,

    #[error("a request is already pending for opcode {0:#04x}")]
    RequestAlreadyPending(u8),

    #[error("request for opcode {0:#04x} superseded by a newer request")]
    Superseded(u8),
}

impl LinkError {
    /// Transport-level failures a sensor read may swallow
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::ResponseTimeout { .. } | Self::LinkUnavailable)
    }
}
