//! Bluetooth Module
//!
//! BLE backend for the command link. The UART profile is shared; the WinRT
//! implementation is Windows only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                     │
//! │        (connects, owns the session and handlers)        │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌────────────┐
//! │  Scanner  │  │ Connection │  │  Protocol  │
//! │           │  │            │  │            │
//! │ - BLE     │  │ - GATT     │  │ - UART     │
//! │ discovery │  │   access   │  │   UUIDs    │
//! │           │  │ - notify   │  │ - buffers  │
//! └───────────┘  └────────────┘  └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`profile`] - Nordic UART UUIDs, advertised names, write sizing
//! - [`protocol`] - GUID parsing and WinRT buffer helpers
//! - [`scanner`] - BLE device discovery
//! - [`connection`] - Device connection and GATT characteristic access
//! - [`service`] - Service coordinator and GATT transport

#[cfg(windows)]
pub mod connection;
pub mod profile;
#[cfg(windows)]
pub mod protocol;
#[cfg(windows)]
pub mod scanner;
#[cfg(windows)]
pub mod service;

#[cfg(windows)]
pub use service::{BluetoothService, GattTransport};
