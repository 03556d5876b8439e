//! MatataLab BLE command link
//!
//! Request/response correlation over the controller's serial-over-BLE link,
//! plus typed wrappers for the controller and bot peripherals.

pub mod domain;
pub mod infrastructure;

pub use domain::peripherals::{Bot, Controller, PeripheralError};
pub use domain::settings::{Settings, SettingsService};
pub use infrastructure::link::{CommandChannel, Correlator, LinkError, LinkEvent, Session};
