//! Bluetooth Service Module
//!
//! Connects to a controller and wires its GATT characteristics into a link
//! [`Session`]: notifications feed the session, outbound frames go through a
//! [`GattTransport`] whose write pump writes packets chunk by chunk.

use crate::domain::models::ConnectionStatus;
use crate::domain::peripherals::status::REQUEST_STATUS;
use crate::domain::settings::LinkSettings;
use crate::infrastructure::bluetooth::{
    connection::{BleConnection, ConnectionConfig, ConnectionResult},
    protocol,
    scanner::BleScanner,
};
use crate::infrastructure::link::{packet, Correlator, LinkError, LinkEvent, Session, Transport};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus, GattSession, GattValueChangedEventArgs,
    GattWriteOption,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;

/// Transport over the UART write characteristic
pub struct GattTransport {
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl GattTransport {
    /// Spawn the write pump; it stops once the transport is dropped
    pub fn spawn(
        characteristic: GattCharacteristic,
        chunk_size: usize,
        connected: Arc<AtomicBool>,
    ) -> (Self, JoinHandle<()>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(write_pump(characteristic, chunk_size, rx));
        (
            Self {
                connected,
                outbound,
            },
            pump,
        )
    }
}

impl Transport for GattTransport {
    fn transmit(&self, frame: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::LinkUnavailable);
        }
        let packet = packet::encode(frame)?;
        self.outbound
            .send(packet)
            .map_err(|_| LinkError::LinkUnavailable)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn write_pump(
    characteristic: GattCharacteristic,
    chunk_size: usize,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(packet) = rx.recv().await {
        for chunk in packet::chunks(&packet, chunk_size) {
            if let Err(e) = write_chunk(&characteristic, chunk).await {
                // the rest of this packet is useless once a chunk is lost
                warn!("GATT write failed, dropping packet {:02X?}: {}", packet, e);
                break;
            }
        }
    }
    debug!("Write pump stopped");
}

async fn write_chunk(characteristic: &GattCharacteristic, chunk: &[u8]) -> Result<()> {
    let buffer = protocol::write_buffer(chunk)?;
    let result = characteristic
        .WriteValueWithResultAndOptionAsync(&buffer, GattWriteOption::WriteWithoutResponse)?
        .await?;
    let status = result.Status()?;
    if status != GattCommunicationStatus::Success {
        anyhow::bail!("write status {:?}", status);
    }
    Ok(())
}

struct ActiveLink {
    device: BluetoothLEDevice,
    notify_characteristic: GattCharacteristic,
    _gatt_session: Option<GattSession>,
    value_token: i64,
    status_token: i64,
    connected: Arc<AtomicBool>,
    session: Arc<Session>,
    pump: JoinHandle<()>,
}

pub struct BluetoothService {
    link: Option<ActiveLink>,
    scanner: BleScanner,
    event_sender: mpsc::UnboundedSender<LinkEvent>,
    settings: LinkSettings,
}

impl BluetoothService {
    pub fn new(event_sender: mpsc::UnboundedSender<LinkEvent>, settings: LinkSettings) -> Self {
        Self {
            link: None,
            scanner: BleScanner::new(event_sender.clone()),
            event_sender,
            settings,
        }
    }

    pub fn start_scan(&mut self, show_all_devices: bool) -> Result<()> {
        self.scanner
            .start(&self.settings.service_uuid, show_all_devices)
    }

    pub fn stop_scan(&mut self) -> Result<()> {
        self.scanner.stop()
    }

    /// Connect and return the session every wrapper talks through
    pub async fn connect(&mut self, address: u64) -> Result<Arc<Session>> {
        self.disconnect();
        let _ = self
            .event_sender
            .send(LinkEvent::ConnectionStatus(ConnectionStatus::Connecting));

        let connection = BleConnection::new(ConnectionConfig::from(&self.settings));
        let result = match connection.connect(address).await {
            Ok(result) => result,
            Err(e) => {
                let _ = self
                    .event_sender
                    .send(LinkEvent::ConnectionStatus(ConnectionStatus::Error));
                return Err(e);
            }
        };

        let connected = Arc::new(AtomicBool::new(BleConnection::is_connected(&result.device)));
        let (transport, pump) = GattTransport::spawn(
            result.write_characteristic.clone(),
            result.chunk_size,
            connected.clone(),
        );
        let correlator = Arc::new(Correlator::new(
            Arc::new(transport),
            self.settings.conflict_policy,
        ));
        let session = Arc::new(
            Session::new(correlator, self.event_sender.clone()).observing(&[REQUEST_STATUS]),
        );

        let (value_token, status_token) =
            Self::setup_event_handlers(&result, &session, &connected)?;

        session.on_connection_changed(connected.load(Ordering::SeqCst));

        let ConnectionResult {
            device,
            session: gatt_session,
            notify_characteristic,
            ..
        } = result;
        self.link = Some(ActiveLink {
            device,
            notify_characteristic,
            _gatt_session: gatt_session,
            value_token,
            status_token,
            connected,
            session: session.clone(),
            pump,
        });

        Ok(session)
    }

    fn setup_event_handlers(
        result: &ConnectionResult,
        session: &Arc<Session>,
        connected: &Arc<AtomicBool>,
    ) -> Result<(i64, i64)> {
        let receiver = session.clone();
        let value_handler = TypedEventHandler::new(
            move |_: windows::core::Ref<GattCharacteristic>,
                  args: windows::core::Ref<GattValueChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    match args
                        .CharacteristicValue()
                        .map_err(anyhow::Error::from)
                        .and_then(|value| protocol::read_buffer(&value))
                    {
                        Ok(bytes) => receiver.on_notification(&bytes),
                        Err(e) => warn!("Failed to read notification: {}", e),
                    }
                }
                Ok(())
            },
        );
        let value_token = result.notify_characteristic.ValueChanged(&value_handler)?;

        let receiver = session.clone();
        let flag = connected.clone();
        let status_handler =
            TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    let is_up = dev.ConnectionStatus()? == BluetoothConnectionStatus::Connected;
                    flag.store(is_up, Ordering::SeqCst);
                    receiver.on_connection_changed(is_up);
                }
                Ok(())
            });
        let status_token = result.device.ConnectionStatusChanged(&status_handler)?;

        Ok((value_token, status_token))
    }

    pub fn disconnect(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        let _ = link
            .notify_characteristic
            .RemoveValueChanged(link.value_token);
        let _ = link.device.RemoveConnectionStatusChanged(link.status_token);
        link.connected.store(false, Ordering::SeqCst);
        link.session.on_connection_changed(false);
        link.pump.abort();
        let _ = link.device.Close();

        info!("Disconnected from device");
    }
}

impl Drop for BluetoothService {
    fn drop(&mut self) {
        self.disconnect();
    }
}
