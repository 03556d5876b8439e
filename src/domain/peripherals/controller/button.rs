//! Controller buttons: `0x20 0x07 <button>`, last reply byte > 0 while pressed

use crate::domain::peripherals::request::{self, flag};
use crate::domain::peripherals::{PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

const OPCODE: u8 = 0x20;
const SELECTOR: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Play = 0x01,
    Delete = 0x02,
    TurnRight = 0x03,
    Forward = 0x04,
    TurnLeft = 0x05,
    Music = 0x06,
    Backward = 0x07,
}

pub struct Buttons {
    link: Arc<dyn CommandChannel>,
    options: ReadOptions,
}

impl Buttons {
    pub fn new(link: Arc<dyn CommandChannel>, options: ReadOptions) -> Self {
        Self { link, options }
    }

    pub async fn is_pressed(&self, button: Button) -> Result<bool, PeripheralError> {
        request::read(
            self.link.as_ref(),
            OPCODE,
            &[SELECTOR, button as u8],
            self.options,
            false,
            |reply| flag(OPCODE, reply),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[tokio::test]
    async fn test_button_pressed() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![Ok(vec![0x07, 0x06, 0x01])]));
        let buttons = Buttons::new(channel.clone(), ReadOptions::default());
        assert_eq!(buttons.is_pressed(Button::Music).await, Ok(true));
        assert_eq!(channel.sent()[0].payload, vec![0x07, 0x06]);
    }

    #[tokio::test]
    async fn test_unanswered_query_reads_released() {
        let buttons = Buttons::new(Arc::new(ScriptedChannel::default()), ReadOptions::default());
        assert_eq!(buttons.is_pressed(Button::Play).await, Ok(false));
    }
}
