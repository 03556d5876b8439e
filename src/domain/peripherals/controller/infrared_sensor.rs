//! Infrared obstacle sensor: `0x20 0x04`, last reply byte > 0 when an obstacle is ahead

use crate::domain::peripherals::request::{self, flag};
use crate::domain::peripherals::{PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

const OPCODE: u8 = 0x20;
const SELECTOR: u8 = 0x04;

pub struct InfraredSensor {
    link: Arc<dyn CommandChannel>,
    options: ReadOptions,
}

impl InfraredSensor {
    pub fn new(link: Arc<dyn CommandChannel>, options: ReadOptions) -> Self {
        Self { link, options }
    }

    pub async fn is_obstacle_ahead(&self) -> Result<bool, PeripheralError> {
        request::read(self.link.as_ref(), OPCODE, &[SELECTOR], self.options, false, |reply| {
            flag(OPCODE, reply)
        })
        .await
    }
}
