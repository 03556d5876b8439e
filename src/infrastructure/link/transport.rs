//! Transport boundary
//!
//! The transport owns the physical connection. It accepts raw outbound frame
//! bytes and reports whether the link is up; inbound frames are pushed into
//! the correlator by whoever owns the notification callback.

use super::error::LinkError;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

pub trait Transport: Send + Sync {
    /// Best-effort send of one encoded frame. No acknowledgement at this layer.
    fn transmit(&self, frame: &[u8]) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;
}

/// In-memory transport
///
/// Every transmitted frame is forwarded to the receiver returned by
/// [`MemoryTransport::new`], which lets tests and simulations play the
/// peripheral side.
pub struct MemoryTransport {
    connected: AtomicBool,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let transport = Self {
            connected: AtomicBool::new(true),
            outbound,
        };
        (transport, rx)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn transmit(&self, frame: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::LinkUnavailable);
        }
        self.outbound
            .send(frame.to_vec())
            .map_err(|_| LinkError::LinkUnavailable)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
