//! Color sensor
//!
//! ```text
//! Request : 0x28 0x02 <channel>
//! Reply   : 0x28 0x02 <channel> <reserved> <value>
//! ```

use crate::domain::models::RgbColor;
use crate::domain::peripherals::request::{self, byte_at};
use crate::domain::peripherals::{PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const OPCODE: u8 = 0x28;
const SELECTOR: u8 = 0x02;
const VALUE_INDEX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Red = 0x01,
    Green = 0x02,
    Blue = 0x03,
}

impl ColorChannel {
    pub fn request(self) -> [u8; 2] {
        [SELECTOR, self as u8]
    }
}

pub struct ColorSensor {
    link: Arc<dyn CommandChannel>,
    options: ReadOptions,
}

impl ColorSensor {
    pub fn new(link: Arc<dyn CommandChannel>, options: ReadOptions) -> Self {
        Self { link, options }
    }

    pub async fn value(&self, channel: ColorChannel) -> Result<u8, PeripheralError> {
        request::read(
            self.link.as_ref(),
            OPCODE,
            &channel.request(),
            self.options,
            0,
            |reply| byte_at(OPCODE, reply, VALUE_INDEX),
        )
        .await
    }

    /// Read the three channels one after the other
    pub async fn rgb(&self) -> Result<RgbColor, PeripheralError> {
        Ok(RgbColor {
            red: self.value(ColorChannel::Red).await?,
            green: self.value(ColorChannel::Green).await?,
            blue: self.value(ColorChannel::Blue).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;
    use crate::domain::peripherals::FailurePolicy;
    use crate::infrastructure::link::LinkError;

    #[tokio::test]
    async fn test_reads_value_byte() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![Ok(vec![
            0x02, 0x01, 0x00, 0x07,
        ])]));
        let sensor = ColorSensor::new(channel.clone(), ReadOptions::default());

        assert_eq!(sensor.value(ColorChannel::Red).await, Ok(0x07));
        let sent = channel.sent();
        assert_eq!(sent[0].opcode, OPCODE);
        assert_eq!(sent[0].reply_opcode, Some(OPCODE));
        assert_eq!(sent[0].payload, vec![0x02, 0x01]);
    }

    #[tokio::test]
    async fn test_timeout_reads_zero() {
        let sensor = ColorSensor::new(Arc::new(ScriptedChannel::default()), ReadOptions::default());
        assert_eq!(sensor.value(ColorChannel::Green).await, Ok(0));

        let sensor = ColorSensor::new(Arc::new(ScriptedChannel::offline()), ReadOptions::default());
        assert_eq!(sensor.value(ColorChannel::Blue).await, Ok(0));
    }

    #[tokio::test]
    async fn test_propagate_policy() {
        let options = ReadOptions {
            on_failure: FailurePolicy::Propagate,
            ..ReadOptions::default()
        };
        let sensor = ColorSensor::new(Arc::new(ScriptedChannel::offline()), options);
        assert_eq!(
            sensor.value(ColorChannel::Red).await,
            Err(PeripheralError::Link(LinkError::LinkUnavailable))
        );
    }

    #[tokio::test]
    async fn test_rgb() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![
            Ok(vec![0x02, 0x01, 0x00, 0x10]),
            Ok(vec![0x02, 0x02, 0x00, 0x20]),
            Ok(vec![0x02, 0x03, 0x00, 0x30]),
        ]));
        let sensor = ColorSensor::new(channel.clone(), ReadOptions::default());
        assert_eq!(sensor.rgb().await, Ok(RgbColor::new(0x10, 0x20, 0x30)));

        let selectors: Vec<u8> = channel.sent().iter().map(|s| s.payload[1]).collect();
        assert_eq!(selectors, vec![0x01, 0x02, 0x03]);
    }
}
