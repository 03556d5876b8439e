//! Bot music
//!
//! ```text
//! 0x15 <beat hi> <beat lo> <note hi> <note lo> : Play note
//! 0x16 0x01 <sound>                            : Play melody, music or sound
//! ```
//!
//! Notes are frequencies in Hz, beats are durations in milliseconds.

use crate::domain::peripherals::{request, CommandOptions, PeripheralError};
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;

pub const NOTE_OPCODE: u8 = 0x15;
pub const SOUND_OPCODE: u8 = 0x16;

/// Low octave, C3 to B3
pub const LOW_SCALE: [u16; 7] = [131, 147, 165, 175, 196, 220, 247];
/// Middle octave, C4 to C5
pub const HIGH_SCALE: [u16; 8] = [262, 294, 330, 349, 392, 440, 494, 523];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Melody1 = 0x01,
    Melody2 = 0x02,
    Melody3 = 0x03,
    Melody4 = 0x04,
    Melody5 = 0x05,
    Melody6 = 0x06,
    Melody7 = 0x07,
    Melody8 = 0x08,
    Melody9 = 0x09,
    Melody10 = 0x0a,

    Shiver = 0x0b,
    Startle = 0x0c,
    WakeUp = 0x0e,
    Dizzy = 0x10,

    Music1 = 0x11,
    Music2 = 0x12,
    Music3 = 0x13,
    Music4 = 0x14,
    Music5 = 0x15,
    Music6 = 0x16,

    Hello = 0x21,
    Zzz = 0x24,
    Sleepy = 0x26,
    Smile = 0x27,
    Yes = 0x28,
    UhOh = 0x29,
    No = 0x2b,
    Goodbye = 0x2e,
    Wow = 0x2f,
}

pub fn note_payload(note: u16, beat: u16) -> [u8; 4] {
    let [beat_hi, beat_lo] = beat.to_be_bytes();
    let [note_hi, note_lo] = note.to_be_bytes();
    [beat_hi, beat_lo, note_hi, note_lo]
}

pub struct Music {
    link: Arc<dyn CommandChannel>,
    options: CommandOptions,
}

impl Music {
    pub fn new(link: Arc<dyn CommandChannel>, options: CommandOptions) -> Self {
        Self { link, options }
    }

    pub async fn play_note(&self, note: u16, beat: u16) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), NOTE_OPCODE, &note_payload(note, beat), self.options)
            .await
    }

    pub async fn play(&self, sound: Sound) -> Result<(), PeripheralError> {
        request::command(self.link.as_ref(), SOUND_OPCODE, &[0x01, sound as u8], self.options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peripherals::testing::ScriptedChannel;

    #[test]
    fn test_note_payload() {
        // A4 for half a second
        assert_eq!(note_payload(HIGH_SCALE[5], 500), [0x01, 0xf4, 0x01, 0xb8]);
        assert_eq!(note_payload(LOW_SCALE[0], 250), [0x00, 0xfa, 0x00, 0x83]);
    }

    #[tokio::test]
    async fn test_play_sound() {
        let channel = Arc::new(ScriptedChannel::default());
        let music = Music::new(channel.clone(), CommandOptions::default());
        music.play(Sound::Goodbye).await.unwrap();

        let sent = channel.sent();
        assert_eq!(sent[0].opcode, SOUND_OPCODE);
        assert_eq!(sent[0].payload, vec![0x01, 0x2e]);
    }
}
