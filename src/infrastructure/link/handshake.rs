//! Protocol handshake
//!
//! Sent once the controller greets us over the text channel. The reply tells
//! whether the attached bot and the controller firmware speak this protocol.

use super::channel::CommandChannel;
use super::error::LinkError;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub const OPCODE: u8 = 0x7e;

/// Protocol version 2.2, no extension flags
pub const REQUEST: [u8; 4] = [0x02, 0x02, 0x00, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    Ok,
    /// The bot behind the controller needs a firmware upgrade
    BotNotSupported,
    /// The controller firmware does not match the supported protocol version
    DeviceVersionNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("unexpected handshake reply {0:02X?}")]
    UnexpectedReply(Vec<u8>),
    #[error("handshake refused: {0:?}")]
    Unsupported(HandshakeStatus),
}

/// Classify a handshake reply payload
///
/// ```text
/// [0] : Protocol echo
/// [1] : Bot status (0 = supported)
/// [2] : Firmware status (0 = supported)
/// ```
pub fn parse(payload: &[u8]) -> Result<HandshakeStatus, HandshakeError> {
    match payload {
        [_, 0, 0] => Ok(HandshakeStatus::Ok),
        [_, bot, _] if *bot != 0 => Ok(HandshakeStatus::BotNotSupported),
        [_, _, _] => Ok(HandshakeStatus::DeviceVersionNotSupported),
        other => Err(HandshakeError::UnexpectedReply(other.to_vec())),
    }
}

pub async fn perform(
    channel: &dyn CommandChannel,
    timeout: Duration,
) -> Result<HandshakeStatus, HandshakeError> {
    let reply = channel.send_and_wait(OPCODE, &REQUEST, timeout).await?;
    let status = parse(&reply)?;
    match status {
        HandshakeStatus::Ok => info!("Handshake OK"),
        HandshakeStatus::BotNotSupported => error!("Handshake failed: bot must be upgraded"),
        HandshakeStatus::DeviceVersionNotSupported => {
            error!("Handshake failed: device version not supported")
        }
    }
    Ok(status)
}

/// What the application should do after a handshake attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    Accepted,
    /// Unsupported bot or firmware, or an unparsable reply: drop the device
    Refused(HandshakeError),
    /// No usable answer from the link; the controller greets again on its own
    Unanswered(LinkError),
}

impl Negotiation {
    pub fn from_result(result: Result<HandshakeStatus, HandshakeError>) -> Self {
        match result {
            Ok(HandshakeStatus::Ok) => Self::Accepted,
            Ok(status) => Self::Refused(HandshakeError::Unsupported(status)),
            Err(HandshakeError::Link(e)) => Self::Unanswered(e),
            Err(e) => Self::Refused(e),
        }
    }
}

pub async fn negotiate(channel: &dyn CommandChannel, timeout: Duration) -> Negotiation {
    Negotiation::from_result(perform(channel, timeout).await)
}
