//! MatataLab controller peripherals
//!
//! ```text
//!              ┌──────────────┐
//!              │  Controller  │
//!              └──────┬───────┘
//!    ┌────────┬───────┼────────┬──────────┐
//!  color   motion   sound    infrared   buttons / leds / messages
//! ```

pub mod button;
pub mod color_sensor;
pub mod infrared_sensor;
pub mod leds;
pub mod message;
pub mod motion_sensor;
pub mod sound_sensor;

pub use button::{Button, Buttons};
pub use color_sensor::{ColorChannel, ColorSensor};
pub use infrared_sensor::InfraredSensor;
pub use leds::{Animation, ControllerLeds, Led, LedColor, LedCommand, Level};
pub use message::Messaging;
pub use motion_sensor::{Attitude, Gesture, MotionSensor, Reading};
pub use sound_sensor::SoundSensor;

use super::{CommandOptions, ReadOptions};
use crate::domain::settings::Settings;
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

/// Every controller wrapper, sharing one command channel
pub struct Controller {
    pub color: ColorSensor,
    pub motion: MotionSensor,
    pub sound: SoundSensor,
    pub infrared: InfraredSensor,
    pub buttons: Buttons,
    pub leds: ControllerLeds,
    pub messages: Messaging,
}

impl Controller {
    pub fn new(link: Arc<dyn CommandChannel>, settings: &Settings) -> Self {
        Self::with_options(
            link,
            ReadOptions::from(&settings.sensors),
            CommandOptions::from(&settings.commands),
        )
    }

    pub fn with_options(
        link: Arc<dyn CommandChannel>,
        read: ReadOptions,
        command: CommandOptions,
    ) -> Self {
        Self {
            color: ColorSensor::new(link.clone(), read),
            motion: MotionSensor::new(link.clone(), read),
            sound: SoundSensor::new(link.clone(), read),
            infrared: InfraredSensor::new(link.clone(), read),
            buttons: Buttons::new(link.clone(), read),
            leds: ControllerLeds::new(link.clone(), command),
            messages: Messaging::new(link, read, command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[tokio::test]
    async fn test_wrappers_share_channel() {
        let channel = Arc::new(ScriptedChannel::with_replies(vec![
            Ok(vec![0x03, 0x01]),
            Ok(vec![0x02, 0x02, 0x00, 0x42]),
        ]));
        let controller = Controller::new(channel.clone(), &Settings::default());

        assert_eq!(controller.sound.is_sound_detected().await, Ok(true));
        assert_eq!(controller.color.value(ColorChannel::Green).await, Ok(0x42));
        controller.leds.off().await.unwrap();

        let opcodes: Vec<u8> = channel.sent().iter().map(|s| s.opcode).collect();
        assert_eq!(opcodes, vec![0x20, 0x28, 0x18]);
    }
}
