//! Controller LED ring (12 LEDs)
//!
//! ```text
//! 0x18 0x02 <color> <level>   : Show all
//! 0x18 0x03 <r> <g> <b>       : Show all (RGB)
//! 0x18 0x04 <color> <level>   : Show previous LED
//! 0x18 0x05 <color> <level>   : Show next LED
//! 0x18 0x06 <animation>       : Animation
//! 0x18 0x07 12 x <r> <g> <b>  : Show all (advanced)
//! 0x18 0x08 <index> <r> <g> <b> : Single LED, index 0..=11
//! ```

use crate::domain::models::RgbColor;
use crate::domain::peripherals::{request, CommandOptions, PeripheralError};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const OPCODE: u8 = 0x18;
pub const LED_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    White = 1,
    Red = 2,
    Yellow = 3,
    Green = 4,
    Blue = 5,
    Purple = 6,
    Off = 7,
}

/// Brightness level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Level4 = 4,
    Level5 = 5,
    Level6 = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Spoondrift = 1,
    Meteor = 2,
    Rainbow = 3,
    Firefly = 4,
    ColorWipe = 5,
    Breathe = 6,
}

/// One LED of the ring, numbered 1 to 12
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led(u8);

impl Led {
    pub fn new(number: u8) -> Option<Self> {
        (1..=LED_COUNT as u8).contains(&number).then_some(Self(number))
    }

    /// Zero-based index used on the wire
    pub fn index(self) -> u8 {
        self.0 - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedCommand {
    All { color: LedColor, level: Level },
    AllRgb(RgbColor),
    Previous { color: LedColor, level: Level },
    Next { color: LedColor, level: Level },
    Animation(Animation),
    Custom(Box<[RgbColor; LED_COUNT]>),
    Single { led: Led, color: RgbColor },
}

impl LedCommand {
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::All { color, level } => vec![0x02, *color as u8, *level as u8],
            Self::AllRgb(color) => {
                let mut payload = vec![0x03];
                payload.extend_from_slice(&color.as_bytes());
                payload
            }
            Self::Previous { color, level } => vec![0x04, *color as u8, *level as u8],
            Self::Next { color, level } => vec![0x05, *color as u8, *level as u8],
            Self::Animation(animation) => vec![0x06, *animation as u8],
            Self::Custom(colors) => {
                let mut payload = Vec::with_capacity(1 + LED_COUNT * 3);
                payload.push(0x07);
                for color in colors.iter() {
                    payload.extend_from_slice(&color.as_bytes());
                }
                payload
            }
            Self::Single { led, color } => {
                let mut payload = vec![0x08, led.index()];
                payload.extend_from_slice(&color.as_bytes());
                payload
            }
        }
    }
}

pub struct ControllerLeds {
    link: Arc<dyn CommandChannel>,
    options: CommandOptions,
}

impl ControllerLeds {
    pub fn new(link: Arc<dyn CommandChannel>, options: CommandOptions) -> Self {
        Self { link, options }
    }

    pub async fn apply(&self, command: LedCommand) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), OPCODE, &command.payload(), self.options).await
    }

    pub async fn show_all(&self, color: LedColor, level: Level) -> Result<(), PeripheralError> {
        self.apply(LedCommand::All { color, level }).await
    }

    pub async fn show_all_rgb(&self, color: RgbColor) -> Result<(), PeripheralError> {
        self.apply(LedCommand::AllRgb(color)).await
    }

    pub async fn show_single(&self, led: Led, color: RgbColor) -> Result<(), PeripheralError> {
        self.apply(LedCommand::Single { led, color }).await
    }

    pub async fn animate(&self, animation: Animation) -> Result<(), PeripheralError> {
        self.apply(LedCommand::Animation(animation)).await
    }

    pub async fn off(&self) -> Result<(), PeripheralError> {
        self.show_all_rgb(RgbColor::OFF).await
    }
}
