//! Controller status frames
//!
//! ```text
//! 0x87 <s> : Bot link     (0x01 = bot connected, 0x02 = no bot)
//! 0x88 <s> : Request status (0x00 success, 0x01 failure, 0x07 not in sensor mode)
//! ```

use super::error::PeripheralError;
use crate::infrastructure::link::Frame;
use tracing::debug;

pub const BOT_LINK_STATUS: u8 = 0x87;
pub const REQUEST_STATUS: u8 = 0x88;

const BOT_CONNECTED: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    Failure,
    NotInSensorMode,
    Unsupported(u8),
}

impl RequestStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Success,
            0x01 => Self::Failure,
            0x07 => Self::NotInSensorMode,
            other => Self::Unsupported(other),
        }
    }

    /// Parse the payload of a `0x88` frame
    pub fn parse(payload: &[u8]) -> Result<Self, PeripheralError> {
        match payload.first() {
            Some(&code) => Ok(Self::from_code(code)),
            None => Err(PeripheralError::ShortReply {
                opcode: REQUEST_STATUS,
                expected: 1,
                actual: 0,
            }),
        }
    }

    pub fn into_result(self) -> Result<(), PeripheralError> {
        match self {
            Self::Success => Ok(()),
            other => Err(PeripheralError::Rejected(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    BotLink { connected: bool },
    Request(RequestStatus),
}

impl ControllerStatus {
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        let code = *frame.payload().first()?;
        match frame.opcode() {
            BOT_LINK_STATUS => Some(Self::BotLink {
                connected: code == BOT_CONNECTED,
            }),
            REQUEST_STATUS => Some(Self::Request(RequestStatus::from_code(code))),
            _ => None,
        }
    }
}

/// Last known controller state, fed from unsolicited status frames
#[derive(Debug, Clone)]
pub struct StatusTracker {
    pub is_in_sensor_mode: bool,
    pub is_bot_connected: bool,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self {
            is_in_sensor_mode: true,
            is_bot_connected: false,
        }
    }
}

impl StatusTracker {
    /// Apply a frame; returns false when it is not a status frame
    pub fn update(&mut self, frame: &Frame) -> bool {
        match ControllerStatus::from_frame(frame) {
            Some(ControllerStatus::BotLink { connected }) => {
                // bot link reports only arrive in sensor mode
                self.is_in_sensor_mode = true;
                self.is_bot_connected = connected;
                debug!("Bot connected: {}", connected);
                true
            }
            Some(ControllerStatus::Request(status)) => {
                self.is_in_sensor_mode = status != RequestStatus::NotInSensorMode;
                debug!("Request status: {:?}", status);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_frames() {
        assert_eq!(
            ControllerStatus::from_frame(&Frame::new(0x87, vec![0x01])),
            Some(ControllerStatus::BotLink { connected: true })
        );
        assert_eq!(
            ControllerStatus::from_frame(&Frame::new(0x88, vec![0x07])),
            Some(ControllerStatus::Request(RequestStatus::NotInSensorMode))
        );
        assert_eq!(ControllerStatus::from_frame(&Frame::new(0x88, vec![])), None);
        assert_eq!(ControllerStatus::from_frame(&Frame::new(0x28, vec![0x01])), None);
    }

    #[test]
    fn test_tracker() {
        let mut tracker = StatusTracker::default();
        assert!(tracker.update(&Frame::new(0x87, vec![0x01])));
        assert!(tracker.is_bot_connected);

        assert!(tracker.update(&Frame::new(0x88, vec![0x07])));
        assert!(!tracker.is_in_sensor_mode);

        assert!(tracker.update(&Frame::new(0x87, vec![0x02])));
        assert!(tracker.is_in_sensor_mode);
        assert!(!tracker.is_bot_connected);

        assert!(!tracker.update(&Frame::new(0x20, vec![0x01])));
    }

    #[test]
    fn test_request_status_result() {
        assert_eq!(RequestStatus::parse(&[0x00]).unwrap().into_result(), Ok(()));
        assert_eq!(
            RequestStatus::parse(&[0x01]).unwrap().into_result(),
            Err(PeripheralError::Rejected(RequestStatus::Failure))
        );
        assert_eq!(
            RequestStatus::parse(&[0x42]).unwrap(),
            RequestStatus::Unsupported(0x42)
        );
    }
}
