//! Host Bluetooth capability consumed by the directory and session layers.
//!
//! The host stack is injected as a trait object rather than reached as
//! ambient global state, so the BlueZ backend can be swapped for the
//! in-memory [`mock`] backend in tests.
//!
//! ## Modules
//!
//! - [`bluez`] - production backend over the system BlueZ daemon
//! - [`mock`] - scripted in-memory backend for tests
//!
//! A link consists of a write half for the UART write characteristic and a
//! channel of raw notification payloads from the UART notify characteristic.
//! The backend closes the notification channel when the peripheral drops the
//! link; that closure is the session's disconnect signal.

pub mod bluez;
pub mod mock;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use bluer::Uuid;

/// Nordic UART Service, as exposed by the BBC micro:bit.
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
/// Client-to-peripheral write characteristic.
pub const UART_WRITE_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);
/// Peripheral-to-client notify characteristic.
pub const UART_NOTIFY_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);

/// Payload bytes per write or notification at the default ATT_MTU of 23.
/// The micro:bit does not negotiate higher for the UART service.
pub const DEFAULT_TRANSFER_UNIT: usize = 20;

/// Immutable snapshot of one paired device, valid for the enumeration call
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedDevice {
    /// Display name (the BlueZ alias).
    pub name: String,
    /// Backend identifier, a Bluetooth address in `XX:XX:XX:XX:XX:XX` form.
    pub address: String,
}

/// Backend-level failures. The session layer maps these onto the
/// operator-facing [`ClientError`](crate::errors::ClientError) taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("bluetooth service unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Refused(String),

    #[error("write rejected: {0}")]
    Write(String),
}

/// One open UART-over-BLE link. Owned exclusively by the session that
/// requested it.
pub struct BleLink {
    /// Write half for the UART write characteristic.
    pub writer: Box<dyn UartWriter>,
    /// Raw notification payloads from the UART notify characteristic.
    /// Closed by the backend when the peripheral drops the link.
    pub notifications: mpsc::Receiver<Vec<u8>>,
    /// Maximum payload per write or notification on this link.
    pub transfer_unit: usize,
}

/// Host Bluetooth capability: enumerate paired devices, open links.
#[async_trait]
pub trait BleHost: Send + Sync {
    /// Enumerate devices currently paired with the host adapter. Read-only;
    /// the snapshot is stable only for the duration of one call.
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, LinkError>;

    /// Open a UART link to one paired device and subscribe to its notify
    /// characteristic.
    async fn open(&self, device: &PairedDevice) -> Result<BleLink, LinkError>;
}

/// Write half of an open link. The session's writer task is its sole owner;
/// `close` releases the underlying connection handle.
#[async_trait]
pub trait UartWriter: Send {
    /// Write one transfer-unit-sized chunk to the write characteristic.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), LinkError>;

    /// Release the connection handle.
    async fn close(&mut self);
}
