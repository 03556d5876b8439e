//! Link session
//!
//! Glue between the platform notification callback and the correlator. Raw
//! notifications are unwrapped here; frames nobody waits for, text messages
//! and connection changes are forwarded to the application as [`LinkEvent`]s.
//! Replies on observed opcodes are also copied to the application after they
//! have fulfilled their wait.

use super::codec::Frame;
use super::correlator::{Correlator, Delivery};
use super::packet::Notification;
use crate::domain::models::{ConnectionStatus, ScannedDevice};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Text the controller sends once it is ready for the handshake
pub const GREETING_PREFIX: &str = "Car:[";

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    DeviceFound(ScannedDevice),
    ConnectionStatus(ConnectionStatus),
    Greeting(String),
    Text(String),
    Unsolicited(Frame),
    /// Copy of a matched reply on an observed opcode
    Observed(Frame),
}

pub struct Session {
    correlator: Arc<Correlator>,
    event_sender: mpsc::UnboundedSender<LinkEvent>,
    observed: Vec<u8>,
}

impl Session {
    pub fn new(correlator: Arc<Correlator>, event_sender: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            correlator,
            event_sender,
            observed: Vec::new(),
        }
    }

    /// Also publish matched replies on these opcodes as [`LinkEvent::Observed`]
    pub fn observing(mut self, opcodes: &[u8]) -> Self {
        self.observed = opcodes.to_vec();
        self
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Handle one raw notification from the notify characteristic
    pub fn on_notification(&self, raw: &[u8]) {
        match Notification::parse(raw) {
            Ok(Notification::Packet(bytes)) => match self.correlator.on_frame(&bytes) {
                Delivery::Unmatched(frame) => self.emit(LinkEvent::Unsolicited(frame)),
                Delivery::Matched { opcode, .. } if self.observed.contains(&opcode) => {
                    if let Ok(frame) = Frame::decode(&bytes) {
                        self.emit(LinkEvent::Observed(frame));
                    }
                }
                _ => {}
            },
            Ok(Notification::Text(text)) => {
                if text.starts_with(GREETING_PREFIX) {
                    info!("Controller greeting: {}", text);
                    self.emit(LinkEvent::Greeting(text));
                } else {
                    debug!("Received message: {}", text);
                    self.emit(LinkEvent::Text(text));
                }
            }
            Err(e) => warn!("Failed to decode notification {:02X?}: {}", raw, e),
        }
    }

    pub fn on_connection_changed(&self, connected: bool) {
        let status = if connected {
            ConnectionStatus::Connected
        } else {
            self.correlator.on_disconnect();
            ConnectionStatus::Disconnected
        };
        info!("Link status: {:?}", status);
        self.emit(LinkEvent::ConnectionStatus(status));
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.event_sender.send(event);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.correlator.close();
    }
}
