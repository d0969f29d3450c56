//! Scripted in-memory Bluetooth backend for tests.
//!
//! Devices and their reaction to connection attempts are declared up front;
//! each accepted link hands back a [`MockPeripheral`] through which a test
//! plays the robot: inject notification fragments, inspect written bytes,
//! count handle releases, or drop the link mid-session.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BleHost, BleLink, LinkError, PairedDevice, UartWriter, DEFAULT_TRANSFER_UNIT};

/// How a scripted device reacts to a connection attempt.
pub enum Behavior {
    /// Accept the link and expose a live peripheral handle.
    Accept,
    /// Reject the link with the given reason.
    Refuse(&'static str),
    /// Never complete the attempt, for exercising the connect timeout.
    Hang,
}

/// Peripheral-side observer for one scripted device.
#[derive(Clone, Default)]
pub struct MockPeripheral {
    notify_tx: Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    closes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MockPeripheral {
    /// Deliver one raw notification payload, as if from the notify
    /// characteristic. A no-op when no link is open.
    pub async fn notify(&self, payload: &[u8]) {
        let tx = self.notify_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(payload.to_vec()).await;
        }
    }

    /// Drop the link from the peripheral side, ending the notification
    /// stream. Models the robot being powered off mid-session.
    pub fn drop_link(&self) {
        self.notify_tx.lock().unwrap().take();
    }

    /// Make subsequent writes fail until called again with `false`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Chunks written by the client, in arrival order.
    pub fn written_chunks(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    /// Every written byte, concatenated across chunks.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.lock().unwrap().iter().flatten().copied().collect()
    }

    /// How many times the connection handle has been released.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Scripted host capability.
pub struct MockHost {
    devices: Vec<(PairedDevice, Behavior, MockPeripheral)>,
    transfer_unit: usize,
    available: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            transfer_unit: DEFAULT_TRANSFER_UNIT,
            available: true,
        }
    }

    /// A host whose Bluetooth service cannot be queried at all.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Override the transfer unit negotiated for opened links.
    pub fn with_transfer_unit(mut self, transfer_unit: usize) -> Self {
        self.transfer_unit = transfer_unit;
        self
    }

    /// Declare one paired device and how it reacts to connection attempts.
    /// The returned handle observes traffic once a link is accepted.
    pub fn add_device(&mut self, name: &str, address: &str, behavior: Behavior) -> MockPeripheral {
        let peripheral = MockPeripheral::default();
        self.devices.push((
            PairedDevice {
                name: name.to_string(),
                address: address.to_string(),
            },
            behavior,
            peripheral.clone(),
        ));
        peripheral
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BleHost for MockHost {
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, LinkError> {
        if !self.available {
            return Err(LinkError::Unavailable("org.bluez not reachable".into()));
        }
        Ok(self.devices.iter().map(|(d, _, _)| d.clone()).collect())
    }

    async fn open(&self, target: &PairedDevice) -> Result<BleLink, LinkError> {
        let (_, behavior, peripheral) = self
            .devices
            .iter()
            .find(|(d, _, _)| d.address == target.address)
            .ok_or_else(|| LinkError::Refused(format!("unknown device {}", target.address)))?;

        match behavior {
            Behavior::Refuse(reason) => Err(LinkError::Refused((*reason).to_string())),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behavior::Accept => {
                let (tx, notifications) = mpsc::channel(64);
                *peripheral.notify_tx.lock().unwrap() = Some(tx);
                Ok(BleLink {
                    writer: Box::new(MockWriter {
                        peripheral: peripheral.clone(),
                    }),
                    notifications,
                    transfer_unit: self.transfer_unit,
                })
            }
        }
    }
}

struct MockWriter {
    peripheral: MockPeripheral,
}

#[async_trait]
impl UartWriter for MockWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), LinkError> {
        if self.peripheral.fail_writes.load(Ordering::SeqCst) {
            return Err(LinkError::Write("peripheral rejected the write".into()));
        }
        self.peripheral.written.lock().unwrap().push(chunk.to_vec());
        Ok(())
    }

    // Deliberately unguarded: the counter exists so tests can observe a
    // double release if the session ever performs one.
    async fn close(&mut self) {
        self.peripheral.closes.fetch_add(1, Ordering::SeqCst);
        self.peripheral.drop_link();
    }
}
