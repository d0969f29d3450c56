//! Error taxonomy for the client.
//!
//! Connection-establishment failures are fatal to the invocation and carry a
//! distinct exit status each; mid-session failures are reported per command
//! and leave the session running. A peripheral-initiated disconnect is not an
//! error at all — it is surfaced as a session event.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between the operator and the peripheral.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The host Bluetooth service cannot be queried (daemon down, no
    /// adapter, permission denied).
    #[error("bluetooth service unavailable: {0}")]
    DirectoryUnavailable(String),

    /// No paired device carries the requested display name.
    #[error("no paired device named '{0}'")]
    DeviceNotFound(String),

    /// The link did not reach Connected within the bounded interval.
    #[error("connection to '{name}' timed out after {timeout:?}")]
    ConnectTimeout { name: String, timeout: Duration },

    /// The peripheral (or the stack on its behalf) rejected the link.
    #[error("peripheral '{name}' refused the connection: {reason}")]
    ConnectRefused { name: String, reason: String },

    /// A send was attempted while the session is not Connected.
    #[error("not connected")]
    NotConnected,

    /// The underlying characteristic write was rejected or timed out.
    /// Never retried internally: a partially applied multi-chunk write must
    /// not be replayed at the peripheral.
    #[error("characteristic write failed: {0}")]
    WriteFailed(String),
}

impl ClientError {
    /// Process exit status for this error class. Connection-establishment
    /// failures each get their own code so scripts can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::DirectoryUnavailable(_) => 1,
            ClientError::DeviceNotFound(_) => 2,
            ClientError::ConnectTimeout { .. } => 3,
            ClientError::ConnectRefused { .. } => 4,
            ClientError::NotConnected | ClientError::WriteFailed(_) => 1,
        }
    }
}
