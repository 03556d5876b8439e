//! Bot eyes
//!
//! ```text
//! 0x17 <mask> <r> <g> <b> : mask bit 1 = left eye, bit 2 = right eye
//! ```

use crate::domain::models::RgbColor;
use crate::domain::peripherals::{request, CommandOptions, PeripheralError};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const OPCODE: u8 = 0x17;

const LEFT: u8 = 0x01;
const RIGHT: u8 = 0x02;

/// Frames needed to light the given eyes; one frame when both share a color
pub fn eye_payloads(left: Option<RgbColor>, right: Option<RgbColor>) -> Vec<[u8; 4]> {
    let frame = |mask: u8, color: RgbColor| {
        let [r, g, b] = color.as_bytes();
        [mask, r, g, b]
    };
    match (left, right) {
        (Some(l), Some(r)) if l == r => vec![frame(LEFT | RIGHT, l)],
        (left, right) => left
            .map(|c| frame(LEFT, c))
            .into_iter()
            .chain(right.map(|c| frame(RIGHT, c)))
            .collect(),
    }
}

pub struct Eyes {
    link: Arc<dyn CommandChannel>,
    options: CommandOptions,
}

impl Eyes {
    pub fn new(link: Arc<dyn CommandChannel>, options: CommandOptions) -> Self {
        Self { link, options }
    }

    pub async fn show(
        &self,
        left: Option<RgbColor>,
        right: Option<RgbColor>,
    ) -> Result<(), PeripheralError> {
        for payload in eye_payloads(left, right) {
            request::command(self.link.as_ref(), OPCODE, &payload, self.options).await?;
        }
        Ok(())
    }

    pub async fn off(&self) -> Result<(), PeripheralError> {
        self.show(Some(RgbColor::OFF), Some(RgbColor::OFF)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_payloads() {
        let red = RgbColor::new(0xff, 0, 0);
        let blue = RgbColor::new(0, 0, 0xff);

        assert_eq!(eye_payloads(Some(red), Some(red)), vec![[0x03, 0xff, 0, 0]]);
        assert_eq!(
            eye_payloads(Some(red), Some(blue)),
            vec![[0x01, 0xff, 0, 0], [0x02, 0, 0, 0xff]]
        );
        assert_eq!(eye_payloads(None, Some(blue)), vec![[0x02, 0, 0, 0xff]]);
        assert!(eye_payloads(None, None).is_empty());
    }
}
