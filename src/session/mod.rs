//! Transport session: owns the BLE connection to one peripheral.
//!
//! A session is two background tasks around the link handed over by the
//! [`BleHost`](crate::ble::BleHost) backend:
//!
//! - the **receive pump** decodes the notification byte stream into
//!   line-terminated messages, buffering partials across notifications, and
//!   publishes them as [`SessionEvent`]s;
//! - the **writer task** is the single serialization point for outgoing
//!   lines: every `send` goes through its queue, so bytes reach the
//!   peripheral in `send` call order even under concurrent callers.
//!
//! Lifecycle states travel over a watch channel. Teardown is guarded by an
//! atomic flag and funneled into the writer task, the sole owner of the
//! connection handle, so the handle is released exactly once no matter how
//! many times (or from how many tasks) `close` is called.

pub mod framing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;

use crate::ble::{BleHost, BleLink, LinkError, PairedDevice, UartWriter};
use crate::directory;
use crate::errors::ClientError;
use self::framing::LineAssembler;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Inbound events produced by the receive pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One reassembled message line, terminator stripped.
    Line(String),
    /// The peripheral dropped the link on its own; the session is over.
    PeerDisconnected,
}

/// One queued outgoing line awaiting the writer task.
struct WriteRequest {
    payload: Vec<u8>,
    done: oneshot::Sender<Result<(), ClientError>>,
}

/// An established session. Split into a [`SessionHandle`] and the event
/// stream to pump the two directions from independent tasks.
#[derive(Debug)]
pub struct Session {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Clonable command side of a session: send lines, read state, close.
/// `close` is synchronous and safe to call from a signal path.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    device_name: String,
    state_rx: watch::Receiver<SessionState>,
    state_tx: Arc<watch::Sender<SessionState>>,
    write_tx: mpsc::UnboundedSender<WriteRequest>,
    closed: Arc<AtomicBool>,
}

impl Session {
    /// Resolve `name` against the paired-device directory and open a
    /// session to it. The only operation with a mandatory timeout: the link
    /// either reaches Connected within `connect_timeout` or the attempt
    /// fails with [`ClientError::ConnectTimeout`].
    pub async fn connect(
        host: &dyn BleHost,
        name: &str,
        connect_timeout: Duration,
    ) -> Result<Session, ClientError> {
        let devices = directory::list_paired(host).await?;
        let device = directory::resolve(&devices, name)?;
        info!("connecting to '{}' [{}]", device.name, device.address);

        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let _ = state_tx.send(SessionState::Connecting);

        let link = match timeout(connect_timeout, host.open(&device)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                let _ = state_tx.send(SessionState::Disconnected);
                return Err(open_error(&device, e));
            }
            Err(_) => {
                let _ = state_tx.send(SessionState::Disconnected);
                return Err(ClientError::ConnectTimeout {
                    name: device.name.clone(),
                    timeout: connect_timeout,
                });
            }
        };

        let BleLink {
            writer,
            notifications,
            transfer_unit,
        } = link;

        let (event_tx, events) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let _ = state_tx.send(SessionState::Connected);
        info!("connected to '{}'", device.name);

        tokio::spawn(
            ReceivePump {
                notifications,
                assembler: LineAssembler::new(),
                event_tx,
                state_tx: state_tx.clone(),
                closed: closed.clone(),
            }
            .run(),
        );
        tokio::spawn(
            WriterTask {
                writer,
                write_rx,
                transfer_unit,
                state_tx: state_tx.clone(),
                state_rx: state_rx.clone(),
            }
            .run(),
        );

        Ok(Session {
            handle: SessionHandle {
                device_name: device.name,
                state_rx,
                state_tx,
                write_tx,
                closed,
            },
            events,
        })
    }

    /// Queue one command line and wait for the write result.
    pub async fn send(&self, line: &str) -> Result<(), ClientError> {
        self.handle.send(line).await
    }

    /// Next inbound event. `None` means the session has ended, not "no data
    /// for now" — idle periods block instead.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn close(&self) {
        self.handle.close();
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    pub fn device_name(&self) -> &str {
        self.handle.device_name()
    }

    /// Split into the command handle and the inbound event stream so the two
    /// directions can be pumped without borrowing each other.
    pub fn split(self) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        (self.handle, self.events)
    }
}

impl SessionHandle {
    /// Queue one command line for transmission and wait for the outcome.
    /// The terminator is appended when the caller did not include it; the
    /// payload is chunked to the link's transfer unit by the writer task.
    pub async fn send(&self, line: &str) -> Result<(), ClientError> {
        if *self.state_rx.borrow() != SessionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let mut payload = line.as_bytes().to_vec();
        if payload.last() != Some(&framing::TERMINATOR) {
            payload.push(framing::TERMINATOR);
        }
        let (done, done_rx) = oneshot::channel();
        self.write_tx
            .send(WriteRequest { payload, done })
            .map_err(|_| ClientError::NotConnected)?;
        // A dropped reply means the writer shut down before reaching us.
        done_rx.await.map_err(|_| ClientError::NotConnected)?
    }

    /// Close the session. Idempotent; concurrent callers race on an atomic
    /// flag and only the winner initiates teardown. Never blocks.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing session with '{}'", self.device_name);
        let _ = self.state_tx.send(SessionState::Closing);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for state transitions, for callers that need to await
    /// teardown completion.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn open_error(device: &PairedDevice, err: LinkError) -> ClientError {
    match err {
        LinkError::Unavailable(msg) => ClientError::DirectoryUnavailable(msg),
        LinkError::Refused(reason) | LinkError::Write(reason) => ClientError::ConnectRefused {
            name: device.name.clone(),
            reason,
        },
    }
}

/// Background task decoding notifications into [`SessionEvent`]s.
struct ReceivePump {
    notifications: mpsc::Receiver<Vec<u8>>,
    assembler: LineAssembler,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    state_tx: Arc<watch::Sender<SessionState>>,
    closed: Arc<AtomicBool>,
}

impl ReceivePump {
    async fn run(mut self) {
        debug!("receive pump started");
        while let Some(payload) = self.notifications.recv().await {
            for line in self.assembler.push(&payload) {
                if self.event_tx.send(SessionEvent::Line(line)).is_err() {
                    // Session dropped; nobody left to read.
                    return;
                }
            }
        }
        // Notification stream ended. Unless this side initiated the close,
        // the peripheral dropped the link: Connected -> Disconnected
        // directly, bypassing Closing. The state change also stops the
        // writer task, which releases the handle.
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("peripheral closed the link");
            let _ = self.state_tx.send(SessionState::Disconnected);
            let _ = self.event_tx.send(SessionEvent::PeerDisconnected);
        }
        debug!("receive pump finished");
        // Dropping event_tx ends the event stream: recv() yields None.
    }
}

/// Background task owning the write half. Sole owner of the connection
/// handle, released exactly once when the task exits.
struct WriterTask {
    writer: Box<dyn UartWriter>,
    write_rx: mpsc::UnboundedReceiver<WriteRequest>,
    transfer_unit: usize,
    state_tx: Arc<watch::Sender<SessionState>>,
    state_rx: watch::Receiver<SessionState>,
}

impl WriterTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.write_rx.recv() => match request {
                    Some(req) => self.process(req).await,
                    // Every handle dropped without an explicit close.
                    None => break,
                },
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match *self.state_rx.borrow() {
                        SessionState::Closing | SessionState::Disconnected => break,
                        _ => {}
                    }
                }
            }
        }
        // The single release point. Requests still queued are dropped,
        // failing their senders with NotConnected.
        self.writer.close().await;
        let _ = self.state_tx.send(SessionState::Disconnected);
        debug!("writer task finished, link released");
    }

    async fn process(&mut self, req: WriteRequest) {
        let mut result = Ok(());
        for chunk in framing::chunks(&req.payload, self.transfer_unit) {
            if let Err(e) = self.writer.write_chunk(chunk).await {
                // Not retried: the peripheral may already have applied the
                // delivered prefix of a multi-chunk write.
                result = Err(ClientError::WriteFailed(e.to_string()));
                break;
            }
        }
        let _ = req.done.send(result);
    }
}
