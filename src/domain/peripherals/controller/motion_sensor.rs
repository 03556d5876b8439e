//! Motion sensor
//!
//! ```text
//! Gestures : 0x20 0x02 <gesture>  -> last byte > 0 if true
//! Readings : 0x28 0x01 <reading>  -> trailing f32 little-endian
//! ```

use crate::domain::peripherals::request::{self, f32_le_tail, flag};
use crate::domain::peripherals::{PeripheralError, ReadOptions};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

const GESTURE_OPCODE: u8 = 0x20;
const GESTURE_SELECTOR: u8 = 0x02;
const READING_OPCODE: u8 = 0x28;
const READING_SELECTOR: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Shaken = 0x01,
    HaloUp = 0x02,
    HaloDown = 0x03,
    TiltedLeft = 0x04,
    TiltedRight = 0x05,
    TiltedForward = 0x06,
    TiltedBackward = 0x07,
    Falling = 0x08,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    AccelerationX = 0x01,
    AccelerationY = 0x02,
    AccelerationZ = 0x03,
    Roll = 0x04,
    Pitch = 0x05,
    Yaw = 0x06,
    ShakeStrength = 0x07,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

pub struct MotionSensor {
    link: Arc<dyn CommandChannel>,
    options: ReadOptions,
}

impl MotionSensor {
    pub fn new(link: Arc<dyn CommandChannel>, options: ReadOptions) -> Self {
        Self { link, options }
    }

    pub async fn is(&self, gesture: Gesture) -> Result<bool, PeripheralError> {
        request::read(
            self.link.as_ref(),
            GESTURE_OPCODE,
            &[GESTURE_SELECTOR, gesture as u8],
            self.options,
            false,
            |reply| flag(GESTURE_OPCODE, reply),
        )
        .await
    }

    pub async fn reading(&self, reading: Reading) -> Result<f32, PeripheralError> {
        request::read(
            self.link.as_ref(),
            READING_OPCODE,
            &[READING_SELECTOR, reading as u8],
            self.options,
            0.0,
            |reply| f32_le_tail(READING_OPCODE, reply),
        )
        .await
    }

    pub async fn acceleration(&self) -> Result<(f32, f32, f32), PeripheralError> {
        Ok((
            self.reading(Reading::AccelerationX).await?,
            self.reading(Reading::AccelerationY).await?,
            self.reading(Reading::AccelerationZ).await?,
        ))
    }

    pub async fn attitude(&self) -> Result<Attitude, PeripheralError> {
        Ok(Attitude {
            roll: self.reading(Reading::Roll).await?,
            pitch: self.reading(Reading::Pitch).await?,
            yaw: self.reading(Reading::Yaw).await?,
        })
    }
}
