//! Shared request helpers for wrappers: failure policies and reply decoding

use super::error::PeripheralError;
use super::policy::{CommandMode, CommandOptions, FailurePolicy, ReadOptions};
use super::status::{RequestStatus, REQUEST_STATUS};
use crate::infrastructure::link::{CommandChannel, LinkError};
use tracing::{debug, warn};

/// Query the peripheral and decode the reply. Under [`FailurePolicy::Sentinel`]
/// a timeout or a dead link yields `sentinel` instead of an error.
pub async fn read<T, F>(
    channel: &dyn CommandChannel,
    opcode: u8,
    payload: &[u8],
    options: ReadOptions,
    sentinel: T,
    decode: F,
) -> Result<T, PeripheralError>
where
    T: Send,
    F: FnOnce(&[u8]) -> Result<T, PeripheralError> + Send,
{
    match channel.send_and_wait(opcode, payload, options.timeout).await {
        Ok(reply) => decode(&reply),
        Err(e) if swallow(&e, options.on_failure) => {
            debug!("Read {:#04x} {:02X?} failed ({}), using default", opcode, payload, e);
            Ok(sentinel)
        }
        Err(e) => Err(e.into()),
    }
}

/// Send an actuator command according to the wrapper's command mode
pub async fn command(
    channel: &dyn CommandChannel,
    opcode: u8,
    payload: &[u8],
    options: CommandOptions,
) -> Result<(), PeripheralError> {
    let result = match options.mode {
        CommandMode::FireAndForget => channel.send(opcode, payload),
        CommandMode::Acknowledged => {
            match channel
                .send_and_expect(opcode, REQUEST_STATUS, payload, options.ack_timeout)
                .await
            {
                Ok(reply) => return RequestStatus::parse(&reply)?.into_result(),
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if swallow(&e, options.on_failure) => {
            warn!("Command {:#04x} {:02X?} not delivered: {}", opcode, payload, e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn swallow(error: &LinkError, policy: FailurePolicy) -> bool {
    policy == FailurePolicy::Sentinel && error.is_transport_failure()
}

pub fn byte_at(opcode: u8, reply: &[u8], index: usize) -> Result<u8, PeripheralError> {
    reply
        .get(index)
        .copied()
        .ok_or(PeripheralError::ShortReply {
            opcode,
            expected: index + 1,
            actual: reply.len(),
        })
}

/// Boolean replies carry the answer in their last byte, non-zero meaning true
pub fn flag(opcode: u8, reply: &[u8]) -> Result<bool, PeripheralError> {
    last_byte(opcode, reply).map(|value| value > 0)
}

pub fn last_byte(opcode: u8, reply: &[u8]) -> Result<u8, PeripheralError> {
    match reply.last() {
        Some(&value) => Ok(value),
        None => Err(PeripheralError::ShortReply {
            opcode,
            expected: 1,
            actual: 0,
        }),
    }
}

/// Trailing 32-bit little-endian float
pub fn f32_le_tail(opcode: u8, reply: &[u8]) -> Result<f32, PeripheralError> {
    let short = PeripheralError::ShortReply {
        opcode,
        expected: 4,
        actual: reply.len(),
    };
    let start = reply.len().checked_sub(4).ok_or(short)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&reply[start..]);
    Ok(f32::from_le_bytes(bytes))
}
