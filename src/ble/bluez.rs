//! Production backend over the system BlueZ daemon.
//!
//! Paired-device enumeration reads the `Paired` and `Alias` device
//! properties, the same data the `bluetoothctl devices Paired` listing
//! shows. Opening a link connects the device, locates the Nordic UART
//! service characteristics, and forwards notifications into the link
//! channel until the stream ends.

use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, Address, Device};
use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use super::{
    BleHost, BleLink, LinkError, PairedDevice, UartWriter, DEFAULT_TRANSFER_UNIT,
    UART_NOTIFY_UUID, UART_SERVICE_UUID, UART_WRITE_UUID,
};

/// Host capability backed by bluetoothd's default adapter.
pub struct BluezHost {
    _session: bluer::Session,
    adapter: Adapter,
}

impl BluezHost {
    /// Connect to the Bluetooth daemon and grab the default adapter.
    pub async fn new() -> Result<Self, LinkError> {
        let session = bluer::Session::new().await.map_err(unavailable)?;
        let adapter = session.default_adapter().await.map_err(unavailable)?;
        if !adapter.is_powered().await.map_err(unavailable)? {
            return Err(LinkError::Unavailable(format!(
                "adapter {} is powered off",
                adapter.name()
            )));
        }
        Ok(Self {
            _session: session,
            adapter,
        })
    }
}

fn unavailable(err: bluer::Error) -> LinkError {
    LinkError::Unavailable(err.to_string())
}

fn refused(err: bluer::Error) -> LinkError {
    LinkError::Refused(err.to_string())
}

#[async_trait]
impl BleHost for BluezHost {
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, LinkError> {
        let addresses = self.adapter.device_addresses().await.map_err(unavailable)?;
        let mut devices = Vec::new();
        for addr in addresses {
            let device = match self.adapter.device(addr) {
                Ok(d) => d,
                Err(e) => {
                    debug!("skipping {}: {}", addr, e);
                    continue;
                }
            };
            if !device.is_paired().await.unwrap_or(false) {
                continue;
            }
            let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
            devices.push(PairedDevice {
                name,
                address: addr.to_string(),
            });
        }
        Ok(devices)
    }

    async fn open(&self, target: &PairedDevice) -> Result<BleLink, LinkError> {
        let addr: Address = target
            .address
            .parse()
            .map_err(|_| LinkError::Refused(format!("invalid address '{}'", target.address)))?;
        let device = self.adapter.device(addr).map_err(refused)?;

        if !device.is_connected().await.map_err(refused)? {
            device.connect().await.map_err(refused)?;
        }

        let (write_char, notify_char) = find_uart_characteristics(&device).await?;

        // The subscription happens inside the forwarder task (the stream
        // borrows the characteristic); its outcome is reported back so a
        // rejected subscription still fails the connect.
        let (notify_tx, notifications) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(forward_notifications(notify_char, notify_tx, ready_tx));
        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                return Err(LinkError::Refused(format!(
                    "notification subscription failed: {}",
                    reason
                )))
            }
            Err(_) => return Err(LinkError::Refused("notification task died".into())),
        }

        Ok(BleLink {
            writer: Box::new(BluezWriter { device, write_char }),
            notifications,
            // BlueZ does not surface the negotiated ATT MTU through the
            // remote characteristic API, so stay at the NUS floor.
            transfer_unit: DEFAULT_TRANSFER_UNIT,
        })
    }
}

/// Locate the UART write and notify characteristics on the peripheral.
async fn find_uart_characteristics(
    device: &Device,
) -> Result<(Characteristic, Characteristic), LinkError> {
    let mut write_char = None;
    let mut notify_char = None;

    for service in device.services().await.map_err(refused)? {
        if service.uuid().await.map_err(refused)? != UART_SERVICE_UUID {
            continue;
        }
        for characteristic in service.characteristics().await.map_err(refused)? {
            match characteristic.uuid().await.map_err(refused)? {
                u if u == UART_WRITE_UUID => write_char = Some(characteristic),
                u if u == UART_NOTIFY_UUID => notify_char = Some(characteristic),
                _ => {}
            }
        }
    }

    match (write_char, notify_char) {
        (Some(w), Some(n)) => Ok((w, n)),
        _ => Err(LinkError::Refused(
            "peripheral does not expose the UART service".into(),
        )),
    }
}

/// Subscribe to the notify characteristic and pump its payloads into the
/// link channel. Ends when the stream ends (peripheral gone) or the session
/// side hangs up; dropping the sender is what tells the session the link is
/// down.
async fn forward_notifications(
    notify_char: Characteristic,
    tx: mpsc::Sender<Vec<u8>>,
    ready_tx: oneshot::Sender<Result<(), String>>,
) {
    let stream = match notify_char.notify().await {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    futures::pin_mut!(stream);
    while let Some(payload) = stream.next().await {
        if tx.send(payload).await.is_err() {
            break;
        }
    }
    debug!("notification stream ended");
}

struct BluezWriter {
    device: Device,
    write_char: Characteristic,
}

#[async_trait]
impl UartWriter for BluezWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), LinkError> {
        self.write_char
            .write(chunk)
            .await
            .map_err(|e| LinkError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.device.disconnect().await {
            warn!("disconnect from {} failed: {}", self.device.address(), e);
        }
    }
}
