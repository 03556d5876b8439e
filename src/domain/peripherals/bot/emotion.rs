//! Dances and actions
//!
//! ```text
//! 0x12 0x01 <dance>  : Dance  1..=6
//! 0x13 0x01 <action> : Action 1..=6
//! ```

use crate::domain::peripherals::{request, CommandOptions, PeripheralError};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const DANCE_OPCODE: u8 = 0x12;
pub const ACTION_OPCODE: u8 = 0x13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dance {
    Dance1 = 0x01,
    Dance2 = 0x02,
    Dance3 = 0x03,
    Dance4 = 0x04,
    Dance5 = 0x05,
    Dance6 = 0x06,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Action1 = 0x01,
    Action2 = 0x02,
    Action3 = 0x03,
    Action4 = 0x04,
    Action5 = 0x05,
    Action6 = 0x06,
}

pub struct Emotions {
    link: Arc<dyn CommandChannel>,
    options: CommandOptions,
}

impl Emotions {
    pub fn new(link: Arc<dyn CommandChannel>, options: CommandOptions) -> Self {
        Self { link, options }
    }

    pub async fn dance(&self, dance: Dance) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), DANCE_OPCODE, &[0x01, dance as u8], self.options)
            .await
    }

    pub async fn action(&self, action: Action) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), ACTION_OPCODE, &[0x01, action as u8], self.options)
            .await
    }
}
