//! # nusterm — terminal client for UART-over-BLE peripherals
//!
//! nusterm opens a line-oriented command session with a paired Bluetooth
//! Low-Energy peripheral that speaks the Nordic UART Service, such as a BBC
//! micro:bit driving a robot. Typed commands go out over the UART write
//! characteristic; whatever the peripheral notifies back is printed as it
//! arrives.
//!
//! ## Features
//!
//! - **Paired-device listing**: enumerate devices already bonded with the
//!   host, by display name and address.
//! - **Duplex terminal session**: operator input and incoming messages are
//!   pumped concurrently; neither direction blocks the other.
//! - **Line framing**: notification fragments are reassembled into whole
//!   lines, and outgoing lines are chunked to the link's transfer unit.
//! - **Injected Bluetooth capability**: the BlueZ backend is behind a trait
//!   so tests run against a scripted in-memory host.
//! - **Async design**: built on Tokio; cancellation travels through channel
//!   closure rather than polling.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use nusterm::ble::bluez::BluezHost;
//! use nusterm::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let host = BluezHost::new().await?;
//!     let session = Session::connect(&host, "BBC micro:bit", Duration::from_secs(10)).await?;
//!     session.send("LED:ON").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module organization
//!
//! - [`ble`] - host Bluetooth capability (BlueZ backend and test mock)
//! - [`directory`] - paired-device enumeration and name resolution
//! - [`session`] - connection lifecycle, send ordering, line reassembly
//! - [`terminal`] - the interactive duplex loop
//! - [`config`] - configuration loading and defaults
//! - [`errors`] - the operator-facing error taxonomy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Terminal Loop  │ ← operator input / display
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Session      │ ← state machine, writer queue,
//! │                 │   receive pump
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  BLE capability │ ← BlueZ (production) or
//! │                 │   mock (tests)
//! └─────────────────┘
//! ```

pub mod ble;
pub mod config;
pub mod directory;
pub mod errors;
pub mod logutil;
pub mod session;
pub mod terminal;
