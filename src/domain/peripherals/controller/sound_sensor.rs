//! Sound sensor: `0x20 0x03`, last reply byte > 0 when sound is detected

use crate::domain::peripherals::request::{self, flag};
use crate::domain::peripherals::{PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

const OPCODE: u8 = 0x20;
const SELECTOR: u8 = 0x03;

pub struct SoundSensor {
    link: Arc<dyn CommandChannel>,
    options: ReadOptions,
}

impl SoundSensor {
    pub fn new(link: Arc<dyn CommandChannel>, options: ReadOptions) -> Self {
        Self { link, options }
    }

    pub async fn is_sound_detected(&self) -> Result<bool, PeripheralError> {
        request::read(self.link.as_ref(), OPCODE, &[SELECTOR], self.options, false, |reply| {
            flag(OPCODE, reply)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[tokio::test]
    async fn test_sound_detected() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![Ok(vec![0x03, 0x01])]));
        let sensor = SoundSensor::new(channel.clone(), ReadOptions::default());
        assert_eq!(sensor.is_sound_detected().await, Ok(true));
        assert_eq!(channel.sent()[0].payload, vec![0x03]);
    }
}
