//! Configuration management.
//!
//! TOML configuration with sensible defaults for every field, so the client
//! runs with no config file at all. Precedence is CLI arguments over the
//! config file over built-in defaults.
//!
//! ```toml
//! [connection]
//! default_name = "BBC micro:bit"
//! connect_timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! file = "nusterm.log"
//! ```

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Paired name of a stock BBC micro:bit running the UART service.
pub const DEFAULT_ROBOT_NAME: &str = "BBC micro:bit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Robot name used when `--robot-name` is given without a value.
    #[serde(default = "default_robot_name")]
    pub default_name: String,
    /// Upper bound on connection establishment, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level when no `-v` flags are given: "error", "warn",
    /// "info", "debug" or "trace".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Optional log file; stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_robot_name() -> String {
    DEFAULT_ROBOT_NAME.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_name: default_robot_name(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults; an unreadable
    /// or malformed file is an error worth stopping for.
    pub async fn load(path: &str) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow!("Failed to read config file {}: {}", path, e)),
        }
    }

    /// Connect timeout as a duration, floored at one second.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let cfg = Config::load("/definitely/not/here/nusterm.toml")
            .await
            .expect("defaults");
        assert_eq!(cfg.connection.default_name, DEFAULT_ROBOT_NAME);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nusterm.toml");
        tokio::fs::write(&path, "[connection]\nconnect_timeout_secs = 3\n")
            .await
            .unwrap();
        let cfg = Config::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(cfg.connection.connect_timeout_secs, 3);
        assert_eq!(cfg.connection.default_name, DEFAULT_ROBOT_NAME);
        assert!(cfg.logging.level.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nusterm.toml");
        tokio::fs::write(&path, "[connection\n").await.unwrap();
        assert!(Config::load(path.to_str().unwrap()).await.is_err());
    }

    #[test]
    fn zero_timeout_is_floored() {
        let cfg = Config {
            connection: ConnectionConfig {
                connect_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(1));
    }
}
