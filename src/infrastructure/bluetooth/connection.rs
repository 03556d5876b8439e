//! BLE Connection Module
//!
//! Opens the controller's UART service and subscribes to its notify
//! characteristic.

use crate::domain::models::format_address;
use crate::domain::settings::LinkSettings;
use crate::infrastructure::bluetooth::{profile, protocol};
use anyhow::Result;
use std::time::Duration;
use tracing::{error, info, warn};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattClientCharacteristicConfigurationDescriptorValue,
    GattCommunicationStatus, GattSession,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};

const NOTIFY_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub service_uuid: String,
    pub write_char_uuid: String,
    pub notify_char_uuid: String,
    pub notification_retries: u32,
    /// Write size when the session does not report a PDU size
    pub fallback_chunk_size: usize,
}

impl From<&LinkSettings> for ConnectionConfig {
    fn from(settings: &LinkSettings) -> Self {
        Self {
            service_uuid: settings.service_uuid.clone(),
            write_char_uuid: settings.write_char_uuid.clone(),
            notify_char_uuid: settings.notify_char_uuid.clone(),
            notification_retries: settings.notification_retries.max(1),
            fallback_chunk_size: settings.write_chunk_size,
        }
    }
}

pub struct ConnectionResult {
    pub device: BluetoothLEDevice,
    /// Held to keep Windows from dropping the link between writes
    pub session: Option<GattSession>,
    pub write_characteristic: GattCharacteristic,
    pub notify_characteristic: GattCharacteristic,
    pub chunk_size: usize,
}

pub struct BleConnection {
    config: ConnectionConfig,
}

impl BleConnection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub async fn connect(&self, address: u64) -> Result<ConnectionResult> {
        info!("Connecting to Bluetooth device: {}", format_address(address));

        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address)?.await?;
        info!("Device connected: {:?}", device.Name()?);

        let session = match Self::create_gatt_session(&device).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Failed to create GattSession, continuing anyway: {}", e);
                None
            }
        };
        let chunk_size = session
            .as_ref()
            .and_then(|s| s.MaxPduSize().ok())
            .and_then(profile::write_chunk_size)
            .unwrap_or(self.config.fallback_chunk_size);
        info!("Write chunk size: {} bytes", chunk_size);

        let (write_char, notify_char) = self.get_characteristics(&device).await?;
        self.enable_notifications(&notify_char).await?;

        Ok(ConnectionResult {
            device,
            session,
            write_characteristic: write_char,
            notify_characteristic: notify_char,
            chunk_size,
        })
    }

    async fn create_gatt_session(device: &BluetoothLEDevice) -> Result<GattSession> {
        let device_id = device.BluetoothDeviceId()?;
        let session = GattSession::FromDeviceIdAsync(&device_id)?.await?;
        session.SetMaintainConnection(true)?;
        Ok(session)
    }

    async fn get_characteristics(
        &self,
        device: &BluetoothLEDevice,
    ) -> Result<(GattCharacteristic, GattCharacteristic)> {
        let service_uuid = protocol::parse_uuid(&self.config.service_uuid)?;
        let write_uuid = protocol::parse_uuid(&self.config.write_char_uuid)?;
        let notify_uuid = protocol::parse_uuid(&self.config.notify_char_uuid)?;

        let services_result = device.GetGattServicesForUuidAsync(service_uuid)?.await?;
        if services_result.Status()? != GattCommunicationStatus::Success {
            error!(
                "Failed to get GATT services: {:?}",
                services_result.Status()?
            );
            anyhow::bail!("Failed to get GATT services");
        }

        let services = services_result.Services()?;
        if services.Size()? == 0 {
            anyhow::bail!("UART service not found");
        }
        let service = services.GetAt(0)?;

        let chars_result = service.GetCharacteristicsAsync()?.await?;
        if chars_result.Status()? != GattCommunicationStatus::Success {
            anyhow::bail!("Failed to get characteristics");
        }

        let mut write_char = None;
        let mut notify_char = None;
        let characteristics = chars_result.Characteristics()?;
        for i in 0..characteristics.Size()? {
            let c = characteristics.GetAt(i)?;
            let uuid = c.Uuid()?;
            if uuid == write_uuid {
                write_char = Some(c);
            } else if uuid == notify_uuid {
                notify_char = Some(c);
            }
        }

        let write = write_char.ok_or_else(|| anyhow::anyhow!("Write characteristic not found"))?;
        let notify =
            notify_char.ok_or_else(|| anyhow::anyhow!("Notify characteristic not found"))?;
        Ok((write, notify))
    }

    async fn enable_notifications(&self, notify_char: &GattCharacteristic) -> Result<()> {
        let attempts = self.config.notification_retries;
        for attempt in 1..=attempts {
            let outcome = notify_char
                .WriteClientCharacteristicConfigurationDescriptorAsync(
                    GattClientCharacteristicConfigurationDescriptorValue::Notify,
                )?
                .await;
            match outcome {
                Ok(status) if status == GattCommunicationStatus::Success => {
                    info!("Notifications enabled");
                    return Ok(());
                }
                Ok(status) => warn!(
                    "Notification subscription attempt {} returned {:?}",
                    attempt, status
                ),
                Err(e) => warn!("Notification subscription attempt {} failed: {}", attempt, e),
            }
            if attempt < attempts {
                tokio::time::sleep(NOTIFY_RETRY_DELAY).await;
            }
        }

        error!("Failed to enable notifications after {} attempts", attempts);
        anyhow::bail!("Failed to enable notifications")
    }

    pub fn is_connected(device: &BluetoothLEDevice) -> bool {
        device
            .ConnectionStatus()
            .map(|s| s == BluetoothConnectionStatus::Connected)
            .unwrap_or(false)
    }
}
