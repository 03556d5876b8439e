//! Bot motion
//!
//! ```text
//! 0x10 0x01 <mm hi> <mm lo>   : Forward
//! 0x10 0x02 <mm hi> <mm lo>   : Backward
//! 0x10 0x03 <deg hi> <deg lo> : Turn left
//! 0x10 0x04 <deg hi> <deg lo> : Turn right
//! 0x11 <mask> <ldir> <lspeed> <rdir> <rspeed> : Wheels (left 1, right 2)
//! ```

use crate::domain::peripherals::{request, CommandOptions, PeripheralError};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const MOVE_OPCODE: u8 = 0x10;
pub const WHEEL_OPCODE: u8 = 0x11;

const LEFT: u8 = 0x01;
const RIGHT: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward(u16),
    Backward(u16),
    TurnLeft(u16),
    TurnRight(u16),
}

impl Movement {
    pub fn payload(self) -> [u8; 3] {
        let (selector, amount) = match self {
            Self::Forward(mm) => (0x01, mm),
            Self::Backward(mm) => (0x02, mm),
            Self::TurnLeft(degrees) => (0x03, degrees),
            Self::TurnRight(degrees) => (0x04, degrees),
        };
        let [hi, lo] = amount.to_be_bytes();
        [selector, hi, lo]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Stop,
    Forward(u8),
    Backward(u8),
}

impl Wheel {
    fn as_bytes(self) -> [u8; 2] {
        match self {
            Self::Stop => [0x00, 0x00],
            Self::Forward(speed) => [0x01, speed],
            Self::Backward(speed) => [0x02, speed],
        }
    }
}

/// `None` when neither wheel is addressed
pub fn wheel_payload(left: Option<Wheel>, right: Option<Wheel>) -> Option<[u8; 5]> {
    let mask = left.map_or(0, |_| LEFT) | right.map_or(0, |_| RIGHT);
    if mask == 0 {
        return None;
    }
    let [ldir, lspeed] = left.unwrap_or(Wheel::Stop).as_bytes();
    let [rdir, rspeed] = right.unwrap_or(Wheel::Stop).as_bytes();
    Some([mask, ldir, lspeed, rdir, rspeed])
}

pub struct BotMotion {
    link: Arc<dyn CommandChannel>,
    options: CommandOptions,
}

impl BotMotion {
    pub fn new(link: Arc<dyn CommandChannel>, options: CommandOptions) -> Self {
        Self { link, options }
    }

    pub async fn perform(&self, movement: Movement) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), MOVE_OPCODE, &movement.payload(), self.options).await
    }

    pub async fn forward(&self, mm: u16) -> Result<(), PeripheralError> {
        self.perform(Movement::Forward(mm)).await
    }

    pub async fn backward(&self, mm: u16) -> Result<(), PeripheralError> {
        self.perform(Movement::Backward(mm)).await
    }

    pub async fn turn_left(&self, degrees: u16) -> Result<(), PeripheralError> {
        self.perform(Movement::TurnLeft(degrees)).await
    }

    pub async fn turn_right(&self, degrees: u16) -> Result<(), PeripheralError> {
        self.perform(Movement::TurnRight(degrees)).await
    }

    pub async fn wheels(
        &self,
        left: Option<Wheel>,
        right: Option<Wheel>,
    ) -> Result<(), PeripheralError> {
        match wheel_payload(left, right) {
            Some(payload) => {
                request::command(self.link.as_ref(), WHEEL_OPCODE, &payload, self.options).await
            }
            None => Ok(()),
        }
    }

    pub async fn stop(&self) -> Result<(), PeripheralError> {
        self.wheels(Some(Wheel::Stop), Some(Wheel::Stop)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[test]
    fn test_movement_is_big_endian() {
        assert_eq!(Movement::Forward(300).payload(), [0x01, 0x01, 0x2c]);
        assert_eq!(Movement::TurnRight(90).payload(), [0x04, 0x00, 0x5a]);
    }

    #[test]
    fn test_wheel_payload() {
        assert_eq!(
            wheel_payload(Some(Wheel::Forward(80)), Some(Wheel::Backward(40))),
            Some([0x03, 0x01, 80, 0x02, 40])
        );
        assert_eq!(
            wheel_payload(None, Some(Wheel::Stop)),
            Some([0x02, 0x00, 0x00, 0x00, 0x00])
        );
        assert_eq!(wheel_payload(None, None), None);
    }

    #[tokio::test]
    async fn test_no_wheel_sends_nothing() {
        let channel = Arc::new(ScriptedChannel::default());
        let motion = BotMotion::new(channel.clone(), CommandOptions::default());
        motion.wheels(None, None).await.unwrap();
        assert!(channel.sent().is_empty());

        motion.backward(25).await.unwrap();
        let sent = channel.sent();
        assert_eq!(sent[0].opcode, MOVE_OPCODE);
        assert_eq!(sent[0].payload, vec![0x02, 0x00, 0x19]);
    }
}
