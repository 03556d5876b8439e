//! Command Link Module
//!
//! Synchronous command/response protocol engine shared by every peripheral
//! wrapper.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            Peripheral wrappers (domain::peripherals)     │
//! └─────────────────────┬────────────────────────────────────┘
//!                       │ CommandChannel
//!                       ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Correlator                          │
//! │  send / send_and_wait / on_frame / on_disconnect         │
//! └───────┬───────────────────────────────────▲──────────────┘
//!         │ transmit(frame)                   │ on_frame(frame)
//!         ▼                                   │
//! ┌───────────────┐                   ┌───────┴──────┐
//! │   Transport   │                   │   Session    │
//! │ (GATT, memory)│                   │ (packets,    │
//! │               │                   │  text, events)│
//! └───────────────┘                   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`codec`] - Frame encoding and decoding
//! - [`packet`] - Wire envelope (header, stuffing, CRC-16) and MTU chunking
//! - [`transport`] - Transport boundary and an in-memory implementation
//! - [`correlator`] - Per-opcode request/reply matching
//! - [`session`] - Notification routing and link events
//! - [`handshake`] - Protocol version negotiation

pub mod channel;
pub mod codec;
pub mod correlator;
pub mod error;
pub mod handshake;
pub mod packet;
pub mod session;
pub mod transport;

pub use channel::CommandChannel;
pub use codec::Frame;
pub use correlator::{ConflictPolicy, Correlator, Delivery};
pub use error::{FrameError, LinkError};
pub use session::{LinkEvent, Session};
pub use transport::{MemoryTransport, Transport};
