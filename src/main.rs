use matata_link::domain::settings::SettingsService;
use matata_link::infrastructure::logging::init_logger;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;
    let _log_guard = init_logger(&settings.get().log_settings)?;
    info!("Starting MatataLink");

    if let Err(e) = run(settings).await {
        error!("MatataLink stopped: {:#}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(windows)]
async fn run(mut settings: SettingsService) -> anyhow::Result<()> {
    use matata_link::domain::models::{format_address, parse_address, ConnectionStatus};
    use matata_link::domain::peripherals::{Controller, StatusTracker};
    use matata_link::infrastructure::bluetooth::BluetoothService;
    use matata_link::infrastructure::link::handshake::{self, Negotiation};
    use matata_link::infrastructure::link::{CommandChannel, LinkEvent};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tracing::{debug, warn};

    const SCAN_DURATION: Duration = Duration::from_secs(10);

    let requested = match std::env::args().nth(1) {
        Some(arg) => Some(
            parse_address(&arg)
                .ok_or_else(|| anyhow::anyhow!("Invalid Bluetooth address: {}", arg))?,
        ),
        None => None,
    };

    let link_settings = settings.get().link.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut bluetooth = BluetoothService::new(tx, link_settings.clone());

    let Some(address) = requested.or(settings.get().last_connected_address) else {
        info!("No known device, scanning for {:?}", SCAN_DURATION);
        bluetooth.start_scan(false)?;
        let deadline = tokio::time::sleep(SCAN_DURATION);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(event) = rx.recv() => {
                    if let LinkEvent::DeviceFound(device) = event {
                        info!(
                            "Found {} at {} ({} dBm)",
                            device.name,
                            format_address(device.address),
                            device.signal_strength
                        );
                    }
                }
            }
        }
        bluetooth.stop_scan()?;
        return Ok(());
    };

    let session = bluetooth.connect(address).await?;
    settings.add_known_address(address)?;

    let channel: Arc<dyn CommandChannel> = session.correlator().clone();
    let controller = Controller::new(channel.clone(), settings.get());
    let mut status = StatusTracker::default();

    if !link_settings.handshake_on_greeting {
        match handshake::negotiate(channel.as_ref(), link_settings.request_timeout()).await {
            Negotiation::Accepted => {}
            Negotiation::Refused(e) => {
                error!("Dropping controller: {}", e);
                bluetooth.disconnect();
                return Ok(());
            }
            Negotiation::Unanswered(e) => warn!("Handshake not answered: {}", e),
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    LinkEvent::Greeting(text) => {
                        debug!("Greeting: {}", text);
                        if link_settings.handshake_on_greeting {
                            let timeout = link_settings.request_timeout();
                            match handshake::negotiate(channel.as_ref(), timeout).await {
                                Negotiation::Accepted => {}
                                Negotiation::Refused(e) => {
                                    error!("Dropping controller: {}", e);
                                    break;
                                }
                                Negotiation::Unanswered(e) => {
                                    warn!("Handshake not answered, waiting for next greeting: {}", e);
                                    continue;
                                }
                            }
                        }
                        match controller.color.rgb().await {
                            Ok(color) => info!("Color sensor: {:?}", color),
                            Err(e) => warn!("Color sensor read failed: {}", e),
                        }
                    }
                    LinkEvent::Unsolicited(frame) => {
                        if !status.update(&frame) {
                            debug!("Unsolicited frame: {:02X?}", frame);
                        }
                    }
                    LinkEvent::Observed(frame) => {
                        status.update(&frame);
                    }
                    LinkEvent::Text(text) => info!("Controller says: {}", text),
                    LinkEvent::ConnectionStatus(ConnectionStatus::Disconnected) => {
                        info!("Controller disconnected");
                        break;
                    }
                    LinkEvent::ConnectionStatus(other) => debug!("Connection status: {:?}", other),
                    LinkEvent::DeviceFound(_) => {}
                }
            }
        }
    }

    info!("Link stats: {:?}", session.correlator().stats());
    bluetooth.disconnect();
    Ok(())
}

#[cfg(not(windows))]
async fn run(_settings: SettingsService) -> anyhow::Result<()> {
    anyhow::bail!("No BLE backend for this platform; MatataLink needs Windows")
}
