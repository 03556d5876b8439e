//! BLE Scanner Module
//!
//! Reports each Matata device once per scan. A device qualifies by advertising
//! the UART service or one of the known names.

use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::{profile, protocol};
use crate::infrastructure::link::LinkEvent;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};
use windows::core::GUID;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Foundation::TypedEventHandler;

/// Which advertisements count as a Matata device
#[derive(Debug, Clone, Copy)]
pub struct AdvertisementFilter {
    service: GUID,
    show_all: bool,
}

impl AdvertisementFilter {
    pub fn new(service_uuid: &str, show_all: bool) -> Result<Self> {
        Ok(Self {
            service: protocol::parse_uuid(service_uuid)?,
            show_all,
        })
    }

    pub fn accepts(&self, name: &str, services: &[GUID]) -> bool {
        self.show_all || profile::KNOWN_NAMES.contains(&name) || services.contains(&self.service)
    }
}

/// Addresses already reported during the current scan
#[derive(Debug, Default)]
struct SeenDevices(Mutex<HashSet<u64>>);

impl SeenDevices {
    /// True the first time an address is offered
    fn first_sighting(&self, address: u64) -> bool {
        match self.0.lock() {
            Ok(mut seen) => seen.insert(address),
            Err(poisoned) => poisoned.into_inner().insert(address),
        }
    }
}

pub struct BleScanner {
    watcher: Option<BluetoothLEAdvertisementWatcher>,
    event_sender: mpsc::UnboundedSender<LinkEvent>,
}

impl BleScanner {
    pub fn new(event_sender: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            watcher: None,
            event_sender,
        }
    }

    /// Restart the watcher; every scan starts with an empty seen set
    pub fn start(&mut self, service_uuid: &str, show_all_devices: bool) -> Result<()> {
        self.stop()?;
        info!("Starting BLE scan for service UUID: {}", service_uuid);

        let filter = AdvertisementFilter::new(service_uuid, show_all_devices)?;
        let seen = Arc::new(SeenDevices::default());
        let sender = self.event_sender.clone();

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                let Some(args) = args.as_ref() else {
                    return Ok(());
                };
                let adv = args.Advertisement()?;
                let name = adv.LocalName()?.to_string();
                let advertised = adv.ServiceUuids()?;
                let mut services = Vec::with_capacity(advertised.Size()? as usize);
                for i in 0..advertised.Size()? {
                    services.push(advertised.GetAt(i)?);
                }
                if !filter.accepts(&name, &services) {
                    return Ok(());
                }

                let address = args.BluetoothAddress()?;
                if !seen.first_sighting(address) {
                    trace!("Skipping repeat advertisement from {:012X}", address);
                    return Ok(());
                }

                let device = ScannedDevice {
                    name: if name.is_empty() {
                        "Unknown".to_string()
                    } else {
                        name
                    },
                    address,
                    signal_strength: args.RawSignalStrengthInDBm()?,
                };
                debug!("Found device: {:?}", device);
                let _ = sender.send(LinkEvent::DeviceFound(device));
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);

        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping BLE scan...");
            watcher.Stop()?;
        }
        Ok(())
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
