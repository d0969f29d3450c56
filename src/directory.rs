//! Paired-device directory: enumeration and name resolution.
//!
//! A thin, read-only layer over the injected host capability. Pairing
//! itself is a manual step (hold the buttons, accept the dialog) that
//! happened long before this program ran; the directory only reports what
//! the host already knows.

use log::warn;

use crate::ble::{BleHost, LinkError, PairedDevice};
use crate::errors::ClientError;

/// Enumerate devices currently paired with the host adapter. The returned
/// snapshot is stable only for the duration of this call.
pub async fn list_paired(host: &dyn BleHost) -> Result<Vec<PairedDevice>, ClientError> {
    host.paired_devices()
        .await
        .map_err(|e| ClientError::DirectoryUnavailable(match e {
            LinkError::Unavailable(msg) => msg,
            other => other.to_string(),
        }))
}

/// Resolve a display name to one device. The first match is authoritative;
/// duplicates are reported to the operator and ignored.
pub fn resolve(devices: &[PairedDevice], name: &str) -> Result<PairedDevice, ClientError> {
    let mut matches = devices.iter().filter(|d| d.name == name);
    let first = matches
        .next()
        .ok_or_else(|| ClientError::DeviceNotFound(name.to_string()))?;
    let ignored = matches.count();
    if ignored > 0 {
        warn!(
            "{} paired devices share the name '{}'; using {}",
            ignored + 1,
            name,
            first.address
        );
    }
    Ok(first.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, address: &str) -> PairedDevice {
        PairedDevice {
            name: name.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn resolve_picks_first_of_duplicates() {
        let devices = [
            device("cutebot", "C0:00:00:00:00:01"),
            device("cutebot", "C0:00:00:00:00:02"),
        ];
        let found = resolve(&devices, "cutebot").unwrap();
        assert_eq!(found.address, "C0:00:00:00:00:01");
    }

    #[test]
    fn resolve_reports_missing_names() {
        let devices = [device("cutebot", "C0:00:00:00:00:01")];
        let err = resolve(&devices, "maqueen").unwrap_err();
        assert!(matches!(err, ClientError::DeviceNotFound(n) if n == "maqueen"));
    }
}
